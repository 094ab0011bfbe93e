// Resource descriptors.
//
// A descriptor is the static configuration that parameterizes the
// generic table controller for one entity type: where the resource
// lives, how to render it, which form fields the backend accepts, and
// the envelope key create/update bodies are wrapped under. Descriptors
// are immutable once a screen mounts them.

use folio_api::Record;

/// Declared shape of an endpoint's list payload.
///
/// The backend mixes `{data, meta}` envelopes and bare arrays per
/// endpoint with no documented rule, so the shape is configuration, not
/// inference. The gateway tolerates either regardless; the controller
/// logs a warning when observation contradicts the declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// `{data: [...], meta: {...}}`
    Enveloped,
    /// Bare `[...]`
    Bare,
}

/// Input widget kind for a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Multiline,
    Integer,
    /// `YYYY-MM-DDTHH:MM`, matching the backend's datetime inputs.
    DateTime,
    /// Boolean toggle.
    Flag,
}

/// One table column.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub title: &'static str,
    pub width: u16,
}

/// A named list sub-view backed by its own endpoint (e.g. the books
/// screen's "Available" view). Mutations always go through the
/// descriptor's primary endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ViewSpec {
    pub label: &'static str,
    pub endpoint: &'static str,
}

/// One form field.
///
/// Invariant: `name` must be a key the backend accepts in the endpoint's
/// create/update body.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub help: &'static str,
}

/// Static configuration for one resource screen.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Screen title, e.g. "Books".
    pub title: &'static str,
    /// Noun used in notifications, e.g. "Item" or "Loan".
    pub noun: &'static str,
    /// Resource path, e.g. "/books".
    pub endpoint: &'static str,
    /// Envelope key for create/update bodies. `None` posts fields bare.
    pub envelope: Option<&'static str>,
    pub list_shape: ListShape,
    /// List sub-views beyond the primary endpoint. Empty for most
    /// resources.
    pub views: Vec<ViewSpec>,
    pub columns: Vec<ColumnSpec>,
    pub form_fields: Vec<FieldSpec>,
    /// Initial form values for a create session. Copied into the
    /// session, never aliased.
    pub defaults: Record,
}

impl ResourceDescriptor {
    /// The form fields a submit must find non-empty.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.form_fields.iter().filter(|f| f.required)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.form_fields.iter().find(|f| f.name == name)
    }
}
