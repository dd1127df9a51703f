//! Schema sync pipeline: debounced re-parse of the source text.
//!
//! DESIGN
//! ======
//! Every edit re-arms a single deadline; the parse runs only once the text
//! has been quiet for `debounce_ms`, so a burst of edits produces exactly one
//! parse of the final text. Time is passed in as milliseconds by the caller
//! (`poll(now_ms, ..)`), which keeps the state machine synchronous and lets
//! tests drive it with a simulated clock. The async [`driver`] maps real time
//! onto the same calls.
//!
//! ERROR HANDLING
//! ==============
//! Parse failures never escape the pipeline. A failure records a single
//! [`ParseErrorRecord`] and leaves the previous schema and the layout
//! registry untouched; the next successful parse clears it.

pub mod driver;


use dbml::{Database, Schema};
use tracing::{debug, info, warn};

use crate::registry::{EntityKind, LayoutRegistry};
use crate::schema::{ParseErrorRecord, SchemaParser};

/// Pipeline state. `Parsing` and `Reconciling` only exist inside a single
/// `poll`/`flush` call and are visible in logs, never to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Pending { deadline_ms: u64 },
    Parsing,
    Reconciling,
}

/// Result of one parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The schema was replaced; `removed` layout records were dropped.
    Loaded { removed: usize },
    Failed(ParseErrorRecord),
}

pub struct SchemaSync<P> {
    parser: P,
    format: String,
    debounce_ms: u64,
    text: String,
    state: SyncState,
    database: Option<Database>,
    error: Option<ParseErrorRecord>,
    parse_count: u64,
}

impl<P: SchemaParser> SchemaSync<P> {
    #[must_use]
    pub fn new(parser: P, format: impl Into<String>, debounce_ms: u64) -> Self {
        Self {
            parser,
            format: format.into(),
            debounce_ms,
            text: String::new(),
            state: SyncState::Idle,
            database: None,
            error: None,
            parse_count: 0,
        }
    }

    /// Record new editor text and (re)arm the debounce deadline.
    ///
    /// Returns `false` when `text` equals the current text; nothing is scheduled.
    pub fn on_content_changed(&mut self, text: &str, now_ms: u64) -> bool {
        if text == self.text {
            return false;
        }
        text.clone_into(&mut self.text);
        let deadline_ms = now_ms.saturating_add(self.debounce_ms);
        self.state = SyncState::Pending { deadline_ms };
        debug!(deadline_ms, len = text.len(), "sync: parse scheduled");
        true
    }

    /// When the pending parse is due, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<u64> {
        match self.state {
            SyncState::Pending { deadline_ms } => Some(deadline_ms),
            _ => None,
        }
    }

    /// Run the pending parse if its deadline has passed.
    pub fn poll(&mut self, now_ms: u64, registry: &mut LayoutRegistry) -> Option<SyncOutcome> {
        match self.state {
            SyncState::Pending { deadline_ms } if now_ms >= deadline_ms => Some(self.run(registry)),
            _ => None,
        }
    }

    /// Parse the current text immediately, cancelling any pending deadline.
    pub fn flush(&mut self, registry: &mut LayoutRegistry) -> SyncOutcome {
        self.run(registry)
    }

    fn run(&mut self, registry: &mut LayoutRegistry) -> SyncOutcome {
        self.state = SyncState::Parsing;
        self.parse_count += 1;
        debug!(state = ?self.state, parse = self.parse_count, "sync: parsing");

        let outcome = match self.parser.parse(&self.text, &self.format) {
            Ok(mut database) => {
                database.normalize();
                self.state = SyncState::Reconciling;
                let empty = Schema::default();
                let schema = database.schema().unwrap_or(&empty);
                let removed = reconcile(registry, schema);
                registry.load_schema(schema);
                info!(
                    tables = schema.tables.len(),
                    table_groups = schema.table_groups.len(),
                    refs = schema.refs.len(),
                    removed,
                    "sync: schema loaded"
                );
                self.database = Some(database);
                self.error = None;
                SyncOutcome::Loaded { removed }
            }
            Err(e) => {
                warn!(error = %e, "sync: parse failed; keeping previous schema");
                let record = ParseErrorRecord::from(&e);
                self.error = Some(record.clone());
                SyncOutcome::Failed(record)
            }
        };
        self.state = SyncState::Idle;
        outcome
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// The schema a diagram is drawn from, once one has loaded.
    #[must_use]
    pub fn schema(&self) -> Option<&Schema> {
        self.database.as_ref().and_then(Database::schema)
    }

    #[must_use]
    pub fn error(&self) -> Option<&ParseErrorRecord> {
        self.error.as_ref()
    }

    /// Number of parses started so far.
    #[must_use]
    pub fn parse_count(&self) -> u64 {
        self.parse_count
    }
}

/// Drop layout records whose entity no longer exists in `schema`.
///
/// Survivors are untouched and new entities are not created here; they get
/// their placeholder on first access. Returns the number of records removed.
pub fn reconcile(registry: &mut LayoutRegistry, schema: &Schema) -> usize {
    let mut removed = 0;
    for kind in EntityKind::ALL {
        for id in registry.ids(kind) {
            let present = match kind {
                EntityKind::Table => schema.table(&id).is_some(),
                EntityKind::TableGroup => schema.table_group(&id).is_some(),
                EntityKind::Ref => schema.reference(&id).is_some(),
            };
            if !present && registry.remove(kind, &id).is_some() {
                removed += 1;
            }
        }
    }
    if removed > 0 {
        info!(removed, "sync: removed vanished entities");
    }
    removed
}
