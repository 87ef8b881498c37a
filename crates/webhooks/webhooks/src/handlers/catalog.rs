//! Release and track projection.

use std::sync::Arc;

use first_rule_core::StoreResult;
use first_rule_core::traits::CatalogStore;
use first_rule_core::types::clamp_prominence;
use tracing::{debug, info, warn};

use crate::event::{ReleasePayload, TrackPayload};

/// Projects release and track events into the local catalog.
#[derive(Clone)]
pub struct CatalogSyncHandler {
    store: Arc<dyn CatalogStore>,
}

impl CatalogSyncHandler {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Upserts the release, then links any tracks that arrived before it.
    pub async fn handle_release(&self, payload: ReleasePayload) -> StoreResult<bool> {
        let release = self.store.upsert_release(payload.into_upsert()).await?;

        let linked = self
            .store
            .link_tracks_to_release(&release.external_release_id, &release.id)
            .await?;

        info!(
            external_release_id = %release.external_release_id,
            release_id = %release.id,
            backfilled_tracks = linked,
            "Release synced"
        );
        Ok(true)
    }

    /// Resolves the track's links, then upserts it with whatever resolved.
    ///
    /// An unknown release or voice model leaves the link null; the track is
    /// still stored. A release that lands after the lookup is linked by the
    /// store during the upsert.
    pub async fn handle_track(&self, payload: TrackPayload) -> StoreResult<bool> {
        let release_ref = match payload.release_id.as_deref() {
            Some(external_release_id) => {
                let release = self
                    .store
                    .get_release_by_external_id(external_release_id)
                    .await?;
                if release.is_none() {
                    debug!(
                        external_track_id = %payload.id,
                        external_release_id,
                        "Release not known yet, deferring link"
                    );
                }
                release.map(|r| r.id)
            }
            None => None,
        };

        let voice_model_ref = self.resolve_voice_model(&payload).await?;

        if let Some(score) = payload.prominence_score {
            if clamp_prominence(score) != Some(score) {
                warn!(
                    external_track_id = %payload.id,
                    prominence_score = score,
                    "Prominence score out of range, clamping"
                );
            }
        }

        let track = self
            .store
            .upsert_track(payload.into_upsert(release_ref, voice_model_ref))
            .await?;

        info!(
            external_track_id = %track.external_track_id,
            track_id = %track.id,
            linked_release = track.release_ref.is_some(),
            linked_voice_model = track.voice_model_ref.is_some(),
            "Track synced"
        );
        Ok(true)
    }

    /// Looks the voice model up by local id first, then by canonical name.
    async fn resolve_voice_model(&self, payload: &TrackPayload) -> StoreResult<Option<String>> {
        if let Some(id) = payload.voice_model_id.as_deref() {
            if let Some(model) = self.store.get_voice_model(id).await? {
                return Ok(Some(model.id));
            }
        }

        if let Some(name) = payload.voice_model_reference.as_deref() {
            if let Some(model) = self.store.get_voice_model_by_canonical_name(name).await? {
                return Ok(Some(model.id));
            }
        }

        if payload.voice_model_id.is_some() || payload.voice_model_reference.is_some() {
            debug!(external_track_id = %payload.id, "Voice model not known locally");
        }
        Ok(None)
    }
}
