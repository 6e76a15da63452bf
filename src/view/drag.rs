/// Reorder emitted while dragging: move the row at `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderMove {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging {
        source: usize,
        target: usize,
    },
}

/// Turns drag gestures over the rendered list into live reorder moves.
///
/// Moves are emitted on every drag-over, not on drop; dropping only resets the tracker.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    phase: DragPhase,
}

impl DragController {
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    /// Current position of the dragged row, if any.
    pub fn target(&self) -> Option<usize> {
        match self.phase {
            DragPhase::Dragging { target, .. } => Some(target),
            DragPhase::Idle => None,
        }
    }

    pub fn start(&mut self, index: usize, len: usize, enabled: bool) -> bool {
        if !enabled || index >= len {
            return false;
        }
        self.phase = DragPhase::Dragging {
            source: index,
            target: index,
        };
        true
    }

    pub fn over(&mut self, index: usize, len: usize, enabled: bool) -> Option<ReorderMove> {
        if !enabled {
            return None;
        }
        let DragPhase::Dragging { source, target } = self.phase else {
            return None;
        };
        if index == target || index >= len || target >= len {
            return None;
        }
        self.phase = DragPhase::Dragging {
            source,
            target: index,
        };
        Some(ReorderMove {
            from: target,
            to: index,
        })
    }

    /// Drop, drag-end and aborted drags all land here. Nothing is emitted.
    pub fn end(&mut self) {
        self.phase = DragPhase::Idle;
    }
}
