use super::models::{CalendarEvent, EventRegistration, Identity};
use super::split::{day_record, split_into_days, DaySpan};
use crate::components::document_store::{
    new_document_id, Document, DocumentStore, Filter, WriteOp,
};
use crate::config::Config;
use crate::error::{EngineResult, Error};
use crate::utils::time::{format_store_datetime, month_window};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const EVENT_START_FIELD: &str = "eventStart";
const GROUP_ID_FIELD: &str = "groupId";

/// Persists calendar events as per-day records and reads them back with role-based visibility
#[derive(Clone)]
pub struct EventStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
    buffer_months: u32,
}

impl EventStore {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, buffer_months: u32) -> Self {
        Self {
            store,
            collection: collection.into(),
            buffer_months,
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self::new(store, config.events_collection.clone(), config.query_buffer_months)
    }

    /// Events starting within the buffered window around `year`/`month` that `identity` may see.
    ///
    /// Visibility is applied after the fetch; broadcast types must not be filtered out by owner
    /// at the query level. No identity yields an empty list.
    pub async fn query_events(
        &self,
        year: i32,
        month: u32,
        identity: Option<&Identity>,
    ) -> EngineResult<Vec<CalendarEvent>> {
        let Some(identity) = identity else {
            debug!("No identity yet, skipping event query");
            return Ok(Vec::new());
        };

        let (from, to) = month_window(year, month, self.buffer_months, self.buffer_months)?;
        let filters = [
            Filter::ge(EVENT_START_FIELD, format_store_datetime(&from)),
            Filter::le(EVENT_START_FIELD, format_store_datetime(&to)),
        ];

        let documents = self.store.query(&self.collection, &filters).await?;
        let mut events: Vec<CalendarEvent> = documents
            .into_iter()
            .filter_map(decode_or_warn)
            .filter(|event| identity.can_see(event))
            .collect();
        events.sort_by(|a, b| a.event_start.cmp(&b.event_start).then_with(|| a.id.cmp(&b.id)));

        Ok(events)
    }

    /// Persist one record per covered day in a single atomic batch. Returns the new ids.
    pub async fn create_event(
        &self,
        registration: &EventRegistration,
        owner_id: &str,
    ) -> EngineResult<Vec<String>> {
        let span = DaySpan::from_registration(registration)?;
        let group_id = new_document_id();

        let records = split_into_days(registration, &span, owner_id, &group_id)
            .iter()
            .map(encode)
            .collect::<EngineResult<Vec<_>>>()?;

        let ids = self
            .store
            .add_batch(&self.collection, records)
            .await
            .map_err(as_write_failure)?;

        info!(
            "Created event '{}' as {} day record(s) in group {}",
            registration.summary,
            ids.len(),
            group_id
        );
        Ok(ids)
    }

    /// Rewrite the logical event anchored at `anchor_id`.
    ///
    /// The anchor is updated in place and the group's other day-records are reused in date
    /// order; records past the new span are deleted and missing days are added, all in one
    /// commit. An anchor without a group (written before groups existed) gets a fresh group
    /// and only gains appended records; older ungrouped siblings are left as they are.
    /// Returns the ids of the group's records, anchor first.
    pub async fn update_event(
        &self,
        anchor_id: &str,
        registration: &EventRegistration,
    ) -> EngineResult<Vec<String>> {
        let span = DaySpan::from_registration(registration)?;
        let anchor = self.load(anchor_id).await?;

        let (group_id, siblings) = match &anchor.group_id {
            Some(group_id) => {
                let siblings = self.load_group(group_id).await?;
                let siblings: Vec<CalendarEvent> = siblings
                    .into_iter()
                    .filter(|event| event.id != anchor.id)
                    .collect();
                (group_id.clone(), siblings)
            }
            None => (new_document_id(), Vec::new()),
        };

        let owner = anchor.user_id.as_str();
        let mut ops = vec![WriteOp::Set {
            id: anchor.id.clone(),
            data: encode(&day_record(registration, &span, 0, owner, &group_id))?,
        }];
        let mut kept_ids = vec![anchor.id.clone()];

        let extra_days = span.extra_days();
        for index in 1..=extra_days {
            let data = encode(&day_record(registration, &span, index, owner, &group_id))?;
            match siblings.get(index as usize - 1) {
                Some(sibling) => {
                    kept_ids.push(sibling.id.clone());
                    ops.push(WriteOp::Set {
                        id: sibling.id.clone(),
                        data,
                    });
                }
                None => ops.push(WriteOp::Add(data)),
            }
        }

        let excess: Vec<&CalendarEvent> = siblings.iter().skip(extra_days as usize).collect();
        for sibling in &excess {
            ops.push(WriteOp::Delete {
                id: sibling.id.clone(),
            });
        }

        let added = self
            .store
            .commit(&self.collection, ops)
            .await
            .map_err(as_write_failure)?;

        info!(
            "Updated event {} in group {}: {} kept, {} added, {} removed",
            anchor_id,
            group_id,
            kept_ids.len(),
            added.len(),
            excess.len()
        );

        kept_ids.extend(added);
        Ok(kept_ids)
    }

    /// Delete exactly one day-record; siblings are not touched
    pub async fn delete_event(&self, id: &str) -> EngineResult<()> {
        self.store
            .delete(&self.collection, id)
            .await
            .map_err(as_write_failure)?;
        info!("Deleted event record {}", id);
        Ok(())
    }

    /// Delete every day-record sharing `id`'s group in one commit. Returns how many were removed.
    pub async fn delete_event_group(&self, id: &str) -> EngineResult<usize> {
        let event = self.load(id).await?;

        let ids: Vec<String> = match &event.group_id {
            Some(group_id) => self
                .load_group(group_id)
                .await?
                .into_iter()
                .map(|event| event.id)
                .collect(),
            None => vec![event.id.clone()],
        };

        let count = ids.len();
        let ops = ids.into_iter().map(|id| WriteOp::Delete { id }).collect();
        self.store
            .commit(&self.collection, ops)
            .await
            .map_err(as_write_failure)?;

        info!("Deleted {} record(s) of the event containing {}", count, id);
        Ok(count)
    }

    async fn load(&self, id: &str) -> EngineResult<CalendarEvent> {
        let document = self
            .store
            .get(&self.collection, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("calendar event {}", id)))?;
        decode(document)
    }

    /// Every decodable record of a group, ordered by start
    async fn load_group(&self, group_id: &str) -> EngineResult<Vec<CalendarEvent>> {
        let documents = self
            .store
            .query(&self.collection, &[Filter::eq(GROUP_ID_FIELD, group_id)])
            .await?;

        let mut events: Vec<CalendarEvent> =
            documents.into_iter().filter_map(decode_or_warn).collect();
        events.sort_by(|a, b| a.event_start.cmp(&b.event_start).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }
}

fn encode(event: &CalendarEvent) -> EngineResult<Value> {
    Ok(serde_json::to_value(event)?)
}

fn decode(document: Document) -> EngineResult<CalendarEvent> {
    let mut event: CalendarEvent = serde_json::from_value(document.data).map_err(|e| {
        Error::Parse(format!("Calendar event {} is malformed: {}", document.id, e))
    })?;
    event.id = document.id;
    event.all_day = event.is_all_day();
    Ok(event)
}

fn decode_or_warn(document: Document) -> Option<CalendarEvent> {
    let id = document.id.clone();
    match decode(document) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping calendar event {}: {}", id, e);
            None
        }
    }
}

/// Writes that fail for any reason are reported as write failures
fn as_write_failure(err: Error) -> Error {
    match err {
        Error::Write(_) => err,
        other => Error::Write(other.to_string()),
    }
}
