// Edit sessions.
//
// The transient create/edit state behind an open form dialog, as a
// tagged variant so invalid combinations (a visible dialog with no
// target in edit mode, edits landing mid-submit) are unrepresentable.
// At most one session exists per controller instance.

use folio_api::Record;

/// The session state machine:
/// `NoSession → Creating | Editing → Submitting → NoSession`.
///
/// A failed submit restores the prior open state so the dialog stays up
/// for resubmission; a successful submit or a cancel lands back in
/// `NoSession`.
#[derive(Debug, Clone, Default)]
pub enum EditSession {
    #[default]
    NoSession,
    Creating {
        values: Record,
    },
    Editing {
        target: Record,
        values: Record,
    },
    Submitting {
        /// The open state this submit was entered from, restored verbatim
        /// on failure.
        prior: Box<EditSession>,
    },
}

impl EditSession {
    /// Whether a dialog should be showing.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::NoSession)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }

    pub fn is_editing(&self) -> bool {
        match self {
            Self::Editing { .. } => true,
            Self::Submitting { prior } => prior.is_editing(),
            _ => false,
        }
    }

    /// The current form values, if any.
    pub fn values(&self) -> Option<&Record> {
        match self {
            Self::NoSession => None,
            Self::Creating { values } | Self::Editing { values, .. } => Some(values),
            Self::Submitting { prior } => prior.values(),
        }
    }

    /// Mutable form values. `None` while no session is open or a submit
    /// is in flight — `set_field` is a no-op in both states.
    pub fn values_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Creating { values } | Self::Editing { values, .. } => Some(values),
            _ => None,
        }
    }

    /// The record being edited, if this is (or wraps) an edit session.
    pub fn target(&self) -> Option<&Record> {
        match self {
            Self::Editing { target, .. } => Some(target),
            Self::Submitting { prior } => prior.target(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_are_reachable_through_submitting() {
        let mut values = Record::new();
        values.insert("name", json!("Dune"));
        let open = EditSession::Creating { values };
        let submitting = EditSession::Submitting {
            prior: Box::new(open),
        };

        assert!(submitting.is_open());
        assert!(submitting.is_submitting());
        assert_eq!(submitting.values().unwrap().display("name"), "Dune");
    }

    #[test]
    fn no_edits_land_mid_submit() {
        let mut session = EditSession::Submitting {
            prior: Box::new(EditSession::Creating {
                values: Record::new(),
            }),
        };
        assert!(session.values_mut().is_none());
    }

    #[test]
    fn editing_exposes_target() {
        let target = Record::from_value(json!({"id": 3, "name": "Ada"})).unwrap();
        let session = EditSession::Editing {
            target: target.clone(),
            values: target,
        };
        assert!(session.is_editing());
        assert_eq!(session.target().unwrap().id_segment().unwrap(), "3");
    }
}
