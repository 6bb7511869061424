//! Selection/mode state machine.
//!
//! The two interactive modes are mutually exclusive and only exist while an
//! endpoint is selected; the enum makes that invariant structural — there is
//! no way to be in `Placing` or `Associating` without a selected id.

/// Interactive state of the console.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// No selection, no active mode.
    #[default]
    Idle,
    /// An endpoint is selected and the next map click places it.
    Placing { ont_id: String },
    /// An endpoint is selected and the next aggregation-point click
    /// associates it.
    Associating { ont_id: String },
}

/// Events that move the machine. Map clicks and aggregation-point clicks
/// are not events here: they are gated *by* the current state and always
/// settle back to `Idle` through [`SelectionEvent::Settle`] once the
/// mutation request finishes, success or failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    SelectForPlacement(String),
    SelectForAssociation(String),
    /// Explicit deselection, or the settling of a mutation.
    Settle,
}

impl Selection {
    /// The single transition function. A new selection always replaces the
    /// prior one, whatever state the machine was in.
    pub fn transition(self, event: SelectionEvent) -> Selection {
        match event {
            SelectionEvent::SelectForPlacement(ont_id) => Selection::Placing { ont_id },
            SelectionEvent::SelectForAssociation(ont_id) => Selection::Associating { ont_id },
            SelectionEvent::Settle => Selection::Idle,
        }
    }

    pub fn selected_ont(&self) -> Option<&str> {
        match self {
            Selection::Idle => None,
            Selection::Placing { ont_id } | Selection::Associating { ont_id } => Some(ont_id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }

    pub fn mode_label(&self) -> &'static str {
        match self {
            Selection::Idle => "idle",
            Selection::Placing { .. } => "place",
            Selection::Associating { .. } => "associate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_state_accepts_a_new_selection() {
        let s = Selection::Idle.transition(SelectionEvent::SelectForPlacement("E1".into()));
        assert_eq!(
            s,
            Selection::Placing {
                ont_id: "E1".into()
            }
        );

        // Replacing an active placement with an association for another ONT.
        let s = s.transition(SelectionEvent::SelectForAssociation("E2".into()));
        assert_eq!(
            s,
            Selection::Associating {
                ont_id: "E2".into()
            }
        );
        assert_eq!(s.selected_ont(), Some("E2"));
    }

    #[test]
    fn settle_always_returns_to_idle() {
        let s = Selection::Placing {
            ont_id: "E1".into(),
        };
        assert!(s.transition(SelectionEvent::Settle).is_idle());
        assert!(Selection::Idle.transition(SelectionEvent::Settle).is_idle());
    }

    #[test]
    fn a_mode_implies_a_selection() {
        // The invariant is structural, but keep it pinned down.
        for s in [
            Selection::Placing {
                ont_id: "E".into(),
            },
            Selection::Associating {
                ont_id: "E".into(),
            },
        ] {
            assert!(s.selected_ont().is_some());
        }
        assert!(Selection::Idle.selected_ont().is_none());
    }
}
