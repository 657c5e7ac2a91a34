use crate::data::DataBag;

/// Reverses the visible effect of one executed step.
///
/// Everything the reversal needs is captured when the record is built; the
/// surface and data bag are handed in when it runs.
pub type UndoProcedure<S> = Box<dyn FnOnce(&mut S, &mut DataBag) + Send>;

pub struct UndoRecord<S> {
    /// Index of the step this record reverses
    pub index: usize,
    pub action: &'static str,
    procedure: Option<UndoProcedure<S>>,
}

impl<S> UndoRecord<S> {
    pub fn new<F>(index: usize, action: &'static str, procedure: F) -> Self
    where
        F: FnOnce(&mut S, &mut DataBag) + Send + 'static,
    {
        Self {
            index,
            action,
            procedure: Some(Box::new(procedure)),
        }
    }

    /// A record with nothing to reverse, kept so the stack depth tracks the position.
    pub fn noop(index: usize, action: &'static str) -> Self {
        Self {
            index,
            action,
            procedure: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.procedure.is_none()
    }

    pub fn run(self, surface: &mut S, data: &mut DataBag) {
        if let Some(procedure) = self.procedure {
            procedure(surface, data);
        }
    }
}

impl<S> std::fmt::Debug for UndoRecord<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoRecord")
            .field("index", &self.index)
            .field("action", &self.action)
            .field("noop", &self.is_noop())
            .finish()
    }
}

pub struct UndoStack<S> {
    records: Vec<UndoRecord<S>>,
}

impl<S> Default for UndoStack<S> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<S> UndoStack<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: UndoRecord<S>) {
        self.records.push(record);
    }

    /// Remove the top record and run it; does nothing on an empty stack.
    pub fn pop_and_run(&mut self, surface: &mut S, data: &mut DataBag) -> Option<usize> {
        let record = self.records.pop()?;
        let index = record.index;
        log::debug!("Undoing step {} ({})", index + 1, record.action);
        record.run(surface, data);
        Some(index)
    }

    pub fn peek(&self) -> Option<&UndoRecord<S>> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
