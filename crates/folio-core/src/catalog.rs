// The five shipped resource descriptors.
//
// Columns, form fields, and defaults mirror what the backend accepts
// for each endpoint. All five catalog list endpoints reply with the
// `{data, meta}` envelope; the autocomplete endpoints used by the loan
// screen reply with bare arrays.

use chrono::Utc;
use serde_json::json;

use folio_api::Record;

use crate::descriptor::{ColumnSpec, FieldKind, FieldSpec, ListShape, ResourceDescriptor, ViewSpec};

fn col(field: &'static str, title: &'static str, width: u16) -> ColumnSpec {
    ColumnSpec {
        field,
        title,
        width,
    }
}

fn defaults(value: serde_json::Value) -> Record {
    Record::from_value(value).unwrap_or_default()
}

/// Books: name/ISBN/stock management, with server-computed availability.
pub fn books() -> ResourceDescriptor {
    ResourceDescriptor {
        title: "Books",
        noun: "Item",
        endpoint: "/books",
        envelope: Some("book"),
        list_shape: ListShape::Enveloped,
        views: vec![
            ViewSpec {
                label: "All",
                endpoint: "/books",
            },
            ViewSpec {
                label: "Available",
                endpoint: "/books/available",
            },
        ],
        columns: vec![
            col("id", "ID", 5),
            col("name", "Book Name", 28),
            col("isbn", "ISBN", 16),
            col("stock", "Stock", 7),
            col("available_stock", "Avail", 7),
            col("can_be_borrowed", "Can Borrow", 10),
            col("created_at", "Created", 17),
        ],
        form_fields: vec![
            FieldSpec {
                name: "name",
                label: "Book Name",
                kind: FieldKind::Text,
                required: true,
                help: "Enter the book name",
            },
            FieldSpec {
                name: "description",
                label: "Description",
                kind: FieldKind::Multiline,
                required: false,
                help: "Book description (optional)",
            },
            FieldSpec {
                name: "isbn",
                label: "ISBN",
                kind: FieldKind::Text,
                required: true,
                help: "Enter the ISBN number",
            },
            FieldSpec {
                name: "stock",
                label: "Stock Quantity",
                kind: FieldKind::Integer,
                required: true,
                help: "Enter total stock quantity",
            },
        ],
        defaults: defaults(json!({
            "name": "",
            "description": "",
            "isbn": "",
            "stock": 1,
        })),
    }
}

/// Borrowers: registry of people allowed to take out loans. The loan
/// eligibility columns are computed upstream.
pub fn borrowers() -> ResourceDescriptor {
    ResourceDescriptor {
        title: "Borrowers",
        noun: "Item",
        endpoint: "/borrowers",
        views: Vec::new(),
        envelope: Some("borrower"),
        list_shape: ListShape::Enveloped,
        columns: vec![
            col("id", "ID", 5),
            col("name", "Name", 22),
            col("email", "Email", 26),
            col("id_card_number", "ID Card", 12),
            col("has_active_loan", "Active Loan", 11),
            col("can_borrow_book", "Can Borrow", 10),
            col("has_overdue_loans", "Overdue", 8),
        ],
        form_fields: vec![
            FieldSpec {
                name: "id_card_number",
                label: "ID Card Number",
                kind: FieldKind::Text,
                required: true,
                help: "Enter the ID card number",
            },
            FieldSpec {
                name: "name",
                label: "Full Name",
                kind: FieldKind::Text,
                required: true,
                help: "Enter the borrower's full name",
            },
            FieldSpec {
                name: "email",
                label: "Email Address",
                kind: FieldKind::Text,
                required: true,
                help: "Enter the email address",
            },
        ],
        defaults: defaults(json!({
            "id_card_number": "",
            "name": "",
            "email": "",
        })),
    }
}

/// Loans: status transitions (active/returned/overdue) are computed and
/// applied upstream; the console only displays them and triggers the
/// PATCH actions.
pub fn loans() -> ResourceDescriptor {
    let deadline = (Utc::now() + chrono::Duration::days(14))
        .format("%Y-%m-%dT%H:%M")
        .to_string();
    ResourceDescriptor {
        title: "Loans",
        noun: "Loan",
        endpoint: "/loans",
        views: Vec::new(),
        envelope: Some("loan"),
        list_shape: ListShape::Enveloped,
        columns: vec![
            col("id", "ID", 5),
            col("borrower_name", "Borrower", 18),
            col("book_name", "Book", 20),
            col("borrowed_at", "Borrowed", 17),
            col("return_deadline", "Deadline", 17),
            col("returned_at", "Returned", 17),
            col("status", "Status", 9),
            col("days_overdue", "Days Over", 9),
        ],
        form_fields: vec![
            FieldSpec {
                name: "borrower_id",
                label: "Borrower ID",
                kind: FieldKind::Integer,
                required: true,
                help: "Selected via borrower search",
            },
            FieldSpec {
                name: "book_id",
                label: "Book ID",
                kind: FieldKind::Integer,
                required: true,
                help: "Selected via book search",
            },
            FieldSpec {
                name: "return_deadline",
                label: "Return Deadline",
                kind: FieldKind::DateTime,
                required: true,
                help: "Select return deadline date and time",
            },
        ],
        defaults: defaults(json!({
            "borrower_id": "",
            "book_id": "",
            "return_deadline": deadline,
        })),
    }
}

/// Products: the retail side of the catalog, with a publish flag and a
/// category reference.
pub fn products() -> ResourceDescriptor {
    ResourceDescriptor {
        title: "Products",
        noun: "Item",
        endpoint: "/products",
        views: Vec::new(),
        envelope: Some("product"),
        list_shape: ListShape::Enveloped,
        columns: vec![
            col("id", "ID", 5),
            col("name", "Name", 28),
            col("publish", "Published", 9),
            col("category_name", "Category", 18),
            col("created_at", "Created", 17),
        ],
        form_fields: vec![
            FieldSpec {
                name: "name",
                label: "Product Name",
                kind: FieldKind::Text,
                required: true,
                help: "Enter the product name",
            },
            FieldSpec {
                name: "publish",
                label: "Published",
                kind: FieldKind::Flag,
                required: false,
                help: "Whether the product is publicly visible",
            },
            FieldSpec {
                name: "category_id",
                label: "Category ID",
                kind: FieldKind::Integer,
                required: false,
                help: "Owning category",
            },
        ],
        defaults: defaults(json!({
            "name": "",
            "publish": false,
            "category_id": "",
        })),
    }
}

/// Categories: flat grouping for products.
pub fn categories() -> ResourceDescriptor {
    ResourceDescriptor {
        title: "Categories",
        noun: "Item",
        endpoint: "/categories",
        views: Vec::new(),
        envelope: None,
        list_shape: ListShape::Enveloped,
        columns: vec![
            col("id", "ID", 5),
            col("name", "Name", 30),
            col("created_at", "Created", 17),
            col("updated_at", "Updated", 17),
        ],
        form_fields: vec![FieldSpec {
            name: "name",
            label: "Category Name",
            kind: FieldKind::Text,
            required: true,
            help: "Enter the category name",
        }],
        defaults: defaults(json!({
            "name": "",
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_descriptor_defaults_only_known_fields() {
        for desc in [books(), borrowers(), loans(), products(), categories()] {
            for key in desc.defaults.0.keys() {
                assert!(
                    desc.field(key).is_some(),
                    "{}: default {key:?} has no form field",
                    desc.endpoint
                );
            }
        }
    }

    #[test]
    fn loan_deadline_default_is_datetime_shaped() {
        let desc = loans();
        let deadline = desc.defaults.display("return_deadline");
        // YYYY-MM-DDTHH:MM
        assert_eq!(deadline.len(), 16);
        assert_eq!(&deadline[10..11], "T");
    }
}
