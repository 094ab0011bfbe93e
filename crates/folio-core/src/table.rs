// ── Generic resource table controller ──
//
// Owns the full list → edit → submit → refresh lifecycle for one
// resource type, parameterized only by a descriptor. The list machine
// (Idle → Loading → Idle) and the session machine are independent: a
// background refresh may run while a dialog is open, and neither locks
// the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use folio_api::{ApiClient, ListMeta, ListQuery, Record};

use crate::descriptor::{ListShape, ResourceDescriptor};
use crate::error::CoreError;
use crate::notify::Notification;
use crate::session::EditSession;

/// What a submit will dispatch, decided while the session lock is held.
enum SubmitPlan {
    Create { values: Record },
    Update { id: String, values: Record },
}

/// Controller for one resource table.
///
/// Cheaply cloneable via `Arc`; rows, busy state, pagination meta, and
/// the notification slot are exposed as `watch` channels so the UI
/// observes changes without polling. Concurrent refreshes are allowed:
/// whichever resolves last wins the row set.
#[derive(Clone)]
pub struct TableController {
    inner: Arc<TableInner>,
}

struct TableInner {
    client: ApiClient,
    descriptor: ResourceDescriptor,
    /// List endpoint actually queried. Defaults to the descriptor's;
    /// specializations may point it at a sub-view (e.g. `/loans/overdue`).
    list_endpoint: Mutex<&'static str>,
    query: Mutex<ListQuery>,
    rows: watch::Sender<Arc<Vec<Record>>>,
    meta: watch::Sender<Option<ListMeta>>,
    busy: watch::Sender<bool>,
    notice: watch::Sender<Option<Notification>>,
    session: Mutex<EditSession>,
    shape_flagged: AtomicBool,
}

impl TableController {
    pub fn new(client: ApiClient, descriptor: ResourceDescriptor) -> Self {
        let (rows, _) = watch::channel(Arc::new(Vec::new()));
        let (meta, _) = watch::channel(None);
        let (busy, _) = watch::channel(false);
        let (notice, _) = watch::channel(None);
        let endpoint = descriptor.endpoint;
        Self {
            inner: Arc::new(TableInner {
                client,
                descriptor,
                list_endpoint: Mutex::new(endpoint),
                query: Mutex::new(ListQuery::new()),
                rows,
                meta,
                busy,
                notice,
                session: Mutex::new(EditSession::NoSession),
                shape_flagged: AtomicBool::new(false),
            }),
        }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.inner.descriptor
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn rows(&self) -> watch::Receiver<Arc<Vec<Record>>> {
        self.inner.rows.subscribe()
    }

    pub fn rows_snapshot(&self) -> Arc<Vec<Record>> {
        self.inner.rows.borrow().clone()
    }

    pub fn meta(&self) -> watch::Receiver<Option<ListMeta>> {
        self.inner.meta.subscribe()
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.inner.busy.subscribe()
    }

    pub fn notices(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.notice.subscribe()
    }

    /// The current session state (cloned snapshot).
    pub fn session(&self) -> EditSession {
        self.inner.session.lock().expect("session lock poisoned").clone()
    }

    // ── Notifications ────────────────────────────────────────────

    /// Publish a notification, replacing any active one.
    pub fn notify(&self, notification: Notification) {
        self.inner.notice.send_replace(Some(notification));
    }

    pub fn dismiss_notice(&self) {
        self.inner.notice.send_replace(None);
    }

    // ── List filtering / pagination ──────────────────────────────

    /// Replace the query used by subsequent refreshes (search terms,
    /// `page`/`per_page`, sort).
    pub fn set_query(&self, query: ListQuery) {
        *self.inner.query.lock().expect("query lock poisoned") = query;
    }

    /// Point the list at a different endpoint (sub-views). The mutating
    /// operations keep using the descriptor's endpoint.
    pub fn set_list_endpoint(&self, endpoint: &'static str) {
        *self
            .inner
            .list_endpoint
            .lock()
            .expect("endpoint lock poisoned") = endpoint;
    }

    // ── List lifecycle ───────────────────────────────────────────

    /// Fetch the row set, replacing it wholesale on success.
    ///
    /// Failures surface a notification and leave the prior rows visible.
    /// Malformed payloads coerce to an empty row set at the gateway and
    /// are not an error. No ordering is enforced across overlapping
    /// refreshes; the last to resolve wins.
    pub async fn refresh(&self) {
        let endpoint = *self
            .inner
            .list_endpoint
            .lock()
            .expect("endpoint lock poisoned");
        let query = self.inner.query.lock().expect("query lock poisoned").clone();

        self.inner.busy.send_replace(true);
        let result = self.inner.client.list_page(endpoint, &query).await;
        self.inner.busy.send_replace(false);

        match result {
            Ok(page) => {
                self.flag_shape_mismatch(page.enveloped);
                debug!(endpoint, rows = page.records.len(), "row set replaced");
                self.inner.rows.send_replace(Arc::new(page.records));
                self.inner.meta.send_replace(page.meta);
            }
            Err(e) => {
                warn!(endpoint, error = %e, "refresh failed — keeping prior rows");
                self.notify(Notification::error(format!(
                    "Error fetching data: {}",
                    upstream_message(&e)
                )));
            }
        }
    }

    /// Log (once) when the observed list shape contradicts the declared
    /// one — the upstream contract for that endpoint is undocumented.
    fn flag_shape_mismatch(&self, enveloped: bool) {
        let declared = self.inner.descriptor.list_shape;
        let observed = if enveloped {
            ListShape::Enveloped
        } else {
            ListShape::Bare
        };
        if declared != observed && !self.inner.shape_flagged.swap(true, Ordering::Relaxed) {
            warn!(
                endpoint = self.inner.descriptor.endpoint,
                ?declared,
                ?observed,
                "list shape differs from descriptor — flag endpoint upstream"
            );
        }
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Open a create session seeded with the descriptor's defaults.
    /// The defaults are copied; editing the form never touches them.
    pub fn begin_create(&self) {
        let mut session = self.inner.session.lock().expect("session lock poisoned");
        *session = EditSession::Creating {
            values: self.inner.descriptor.defaults.clone(),
        };
    }

    /// Open an edit session seeded with a copy of the record.
    pub fn begin_edit(&self, record: &Record) {
        let mut session = self.inner.session.lock().expect("session lock poisoned");
        *session = EditSession::Editing {
            target: record.clone(),
            values: record.clone(),
        };
    }

    /// Close the session without submitting.
    pub fn cancel(&self) {
        let mut session = self.inner.session.lock().expect("session lock poisoned");
        *session = EditSession::NoSession;
    }

    /// Update one form value. No-op when no session is open or a submit
    /// is in flight.
    pub fn set_field(&self, name: &str, value: Value) {
        let mut session = self.inner.session.lock().expect("session lock poisoned");
        if let Some(values) = session.values_mut() {
            values.insert(name.to_owned(), value);
        }
    }

    // ── Submit / delete ──────────────────────────────────────────

    /// Submit the open session: create on a Creating session, update on
    /// an Editing one.
    ///
    /// Success closes the session, shows a success notification, and
    /// refreshes the list. Failure keeps the session open with the form
    /// intact (nothing was applied, so there is nothing to roll back)
    /// and shows the upstream error.
    pub async fn submit(&self) {
        let noun = self.inner.descriptor.noun;

        let plan = {
            let mut session = self.inner.session.lock().expect("session lock poisoned");
            match std::mem::take(&mut *session) {
                EditSession::NoSession => return,
                submitting @ EditSession::Submitting { .. } => {
                    // Already in flight; leave it be.
                    *session = submitting;
                    return;
                }
                open => {
                    let plan = match self.plan_submit(&open) {
                        Ok(plan) => plan,
                        Err(e) => {
                            *session = open;
                            drop(session);
                            self.notify(Notification::error(e.to_string()));
                            return;
                        }
                    };
                    *session = EditSession::Submitting {
                        prior: Box::new(open),
                    };
                    plan
                }
            }
        };

        self.inner.busy.send_replace(true);
        let result = match &plan {
            SubmitPlan::Create { values } => {
                self.inner
                    .client
                    .create_one(
                        self.inner.descriptor.endpoint,
                        self.inner.descriptor.envelope,
                        values,
                    )
                    .await
            }
            SubmitPlan::Update { id, values } => {
                self.inner
                    .client
                    .update_one(
                        self.inner.descriptor.endpoint,
                        self.inner.descriptor.envelope,
                        id,
                        values,
                    )
                    .await
            }
        };
        self.inner.busy.send_replace(false);

        match result {
            Ok(_) => {
                {
                    let mut session =
                        self.inner.session.lock().expect("session lock poisoned");
                    *session = EditSession::NoSession;
                }
                let verb = match plan {
                    SubmitPlan::Create { .. } => "created",
                    SubmitPlan::Update { .. } => "updated",
                };
                self.notify(Notification::success(format!(
                    "{noun} {verb} successfully"
                )));
                self.refresh().await;
            }
            Err(e) => {
                {
                    let mut session =
                        self.inner.session.lock().expect("session lock poisoned");
                    if let EditSession::Submitting { prior } =
                        std::mem::take(&mut *session)
                    {
                        *session = *prior;
                    }
                }
                self.notify(Notification::error(format!(
                    "Error saving {}: {}",
                    noun.to_lowercase(),
                    upstream_message(&e)
                )));
            }
        }
    }

    /// Decide what an open session submits, running the required-field
    /// check first.
    fn plan_submit(&self, open: &EditSession) -> Result<SubmitPlan, CoreError> {
        let values = open.values().cloned().unwrap_or_default();
        self.validate(&values)?;
        match open {
            EditSession::Editing { target, .. } => {
                let id = target.id_segment().ok_or_else(|| CoreError::Api {
                    message: "record has no id".into(),
                    status: None,
                })?;
                Ok(SubmitPlan::Update { id, values })
            }
            _ => Ok(SubmitPlan::Create { values }),
        }
    }

    /// Required/empty-field check — the only client-side validation.
    fn validate(&self, values: &Record) -> Result<(), CoreError> {
        for field in self.inner.descriptor.required_fields() {
            let empty = match values.get(field.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if empty {
                return Err(CoreError::Validation {
                    label: field.label.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Delete a record. The caller must have confirmed with the user
    /// out-of-band before invoking this.
    pub async fn remove(&self, id: &str) {
        let noun = self.inner.descriptor.noun;

        self.inner.busy.send_replace(true);
        let result = self
            .inner
            .client
            .delete_one(self.inner.descriptor.endpoint, id)
            .await;
        self.inner.busy.send_replace(false);

        match result {
            Ok(()) => {
                self.notify(Notification::success(format!(
                    "{noun} deleted successfully"
                )));
                self.refresh().await;
            }
            Err(e) => {
                self.notify(Notification::error(format!(
                    "Error deleting {}: {}",
                    noun.to_lowercase(),
                    upstream_message(&e)
                )));
            }
        }
    }
}

/// The message shown to the user for a gateway failure: the upstream
/// body's message when it has one, the error's own rendering otherwise.
pub(crate) fn upstream_message(e: &folio_api::Error) -> String {
    e.server_message().unwrap_or_else(|| e.to_string())
}
