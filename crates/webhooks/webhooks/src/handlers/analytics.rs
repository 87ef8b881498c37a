//! Stream and revenue totals.

use std::sync::Arc;

use first_rule_core::StoreResult;
use first_rule_core::traits::CatalogStore;
use first_rule_core::types::TrackAnalytics;
use tracing::{debug, info};

use crate::event::{RevenueUpdatePayload, StreamUpdatePayload};

/// Applies analytics totals to records that already exist locally.
///
/// Analytics never create catalog records; updates for unknown targets are
/// discarded.
#[derive(Clone)]
pub struct AnalyticsHandler {
    store: Arc<dyn CatalogStore>,
}

impl AnalyticsHandler {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn handle_stream_update(&self, payload: StreamUpdatePayload) -> StoreResult<bool> {
        let mut applied = false;

        if let Some(track_id) = payload.track_id.as_deref() {
            applied |= self
                .apply_to_track(track_id, &payload.track_analytics())
                .await?;
        }

        if let (Some(release_id), Some(platform), Some(streams)) = (
            payload.release_id.as_deref(),
            payload.platform.as_deref(),
            payload.platform_streams,
        ) {
            match self.store.get_release_by_external_id(release_id).await? {
                Some(release) => {
                    self.store
                        .upsert_distribution(&release.id, platform, streams)
                        .await?;
                    info!(
                        external_release_id = release_id,
                        platform,
                        platform_streams = streams,
                        "Platform streams updated"
                    );
                    applied = true;
                }
                None => {
                    debug!(
                        external_release_id = release_id,
                        "Stream update for unknown release discarded"
                    );
                }
            }
        }

        Ok(applied)
    }

    pub async fn handle_revenue_update(&self, payload: RevenueUpdatePayload) -> StoreResult<bool> {
        self.apply_to_track(&payload.track_id, &payload.track_analytics())
            .await
    }

    async fn apply_to_track(
        &self,
        external_track_id: &str,
        analytics: &TrackAnalytics,
    ) -> StoreResult<bool> {
        if analytics.is_empty() {
            debug!(external_track_id, "No track totals in update, skipping");
            return Ok(false);
        }
        match self
            .store
            .apply_track_analytics(external_track_id, analytics)
            .await?
        {
            Some(track) => {
                info!(
                    external_track_id,
                    estimated_streams = ?track.estimated_streams,
                    estimated_revenue = ?track.estimated_revenue,
                    "Track analytics updated"
                );
                Ok(true)
            }
            None => {
                debug!(external_track_id, "Analytics for unknown track discarded");
                Ok(false)
            }
        }
    }
}
