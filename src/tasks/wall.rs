//! The rotation engine: startup fill plus the slot workers that cycle
//! media through the wall.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::Configuration;
use crate::easing::tween;
use crate::error::Error;
use crate::geometry::{anchor_for, scaled_rect, target_size};
use crate::handles::HandleRegistry;
use crate::item::Item;
use crate::region::RegionLock;
use crate::source::{ensure_displayable, FetchError, MediaSource};
use crate::surface::{DisplaySurface, ElementId};
use crate::tracker::AvailabilityTracker;

/// Owns the wall and runs its rotation.
///
/// One scheduler per surface: it fills the lanes at startup, then keeps
/// `rotation.workers` independent slot cycles going until cancelled. A
/// cycle that has placed its element always runs to completion;
/// cancellation is honored between cycles and while a cycle is still
/// waiting for an insertion candidate.
pub struct WallScheduler<S> {
    config: Configuration,
    source: Arc<S>,
    tracker: Arc<AvailabilityTracker>,
    surface: Arc<DisplaySurface>,
    regions: Arc<RegionLock>,
    handles: Arc<HandleRegistry>,
    rng: Mutex<StdRng>,
    cycles: AtomicU64,
}

impl<S: MediaSource> WallScheduler<S> {
    pub fn new(
        config: Configuration,
        source: Arc<S>,
        tracker: Arc<AvailabilityTracker>,
        surface: Arc<DisplaySurface>,
        regions: Arc<RegionLock>,
        handles: Arc<HandleRegistry>,
    ) -> Self {
        let rng = match config.rotation.selection_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::rng().random()),
        };
        Self {
            config,
            source,
            tracker,
            surface,
            regions,
            handles,
            rng: Mutex::new(rng),
            cycles: AtomicU64::new(0),
        }
    }

    /// Completed slot cycles since startup.
    #[must_use]
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Fill the lanes, then run slot workers until cancelled.
    #[instrument(skip_all)]
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<()> {
        self.ensure_runnable()?;
        self.fill(&cancel).await?;

        let mut workers = JoinSet::new();
        for slot in 0..self.config.rotation.workers {
            let scheduler = Arc::clone(&self);
            workers.spawn(scheduler.run_slot(slot, cancel.clone()));
        }
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("slot worker failed: {err:#}"),
                Err(err) => warn!("slot worker panicked: {err}"),
            }
        }
        info!(
            cycles = self.cycles_completed(),
            "rotation stopped"
        );
        Ok(())
    }

    /// Populate every lane edge to edge with resting elements, one
    /// acquisition at a time. No entrance animation, no reservations.
    #[instrument(skip_all)]
    pub async fn fill(&self, cancel: &CancellationToken) -> Result<()> {
        self.ensure_runnable()?;
        let viewport = self.surface.viewport();
        for lane in 0..self.surface.lane_count() {
            while self.surface.lane_content_width(lane) < viewport.width {
                let item = tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("cancel received; abandoning fill");
                        return Ok(());
                    }
                    item = self.tracker.acquire() => item,
                };
                let (width, height) = self.resting_size(&item);
                let element = self
                    .surface
                    .append_resting(lane, &item, width, height)
                    .context("fill lane disappeared")?;
                match self.attach_media(element, &item).await {
                    Ok(()) => self.tracker.release(&item.id),
                    Err(failure) => {
                        warn!(lane, id = %item.id, "fill fetch failed: {failure}");
                        self.remove_and_release_element(element);
                        self.apply_fetch_policy(&item, &failure);
                    }
                }
                sleep(self.config.rotation.fill_pacing).await;
            }
            info!(
                lane,
                elements = self.surface.lane_elements(lane).len(),
                width = self.surface.lane_content_width(lane),
                "lane filled"
            );
        }
        Ok(())
    }

    /// One slot worker: claim, cycle, repeat. A failed cycle is logged
    /// and followed by a pause; it never takes the other slots down.
    #[instrument(skip(self, cancel))]
    async fn run_slot(self: Arc<Self>, slot: usize, cancel: CancellationToken) -> Result<()> {
        let stagger = self.stagger_delay(slot);
        if !stagger.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = sleep(stagger) => {}
            }
        }
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(banner) = self.surface.error_banner() {
                info!(slot, banner, "wall is in a blocking error state; slot stops");
                break;
            }
            let item = tokio::select! {
                _ = cancel.cancelled() => break,
                item = self.tracker.acquire() => item,
            };
            if let Err(err) = self.run_cycle(slot, &item, &cancel).await {
                warn!(slot, id = %item.id, "cycle failed: {err:#}");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(self.config.rotation.failure_pause) => {}
                }
            }
        }
        debug!(slot, "slot worker exiting");
        Ok(())
    }

    /// One full display cycle for one claimed item. Every exit path
    /// settles the element, the region, and the claim, and the claim is
    /// settled exactly once: the moment it is released another slot may
    /// claim the item, and a second release would free that live claim.
    async fn run_cycle(
        &self,
        slot: usize,
        item: &Item,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some((lane, element)) = self.place_with_retry(item, cancel).await else {
            self.tracker.release(&item.id);
            return Ok(());
        };
        if let Err(err) = self.animate_cycle(slot, lane, element, item).await {
            self.regions.free(slot);
            self.remove_and_release_element(element);
            match err.downcast_ref::<FetchError>() {
                Some(failure) => self.apply_fetch_policy(item, failure),
                None => self.tracker.release(&item.id),
            }
            return Err(err);
        }
        Ok(())
    }

    async fn animate_cycle(
        &self,
        slot: usize,
        lane: usize,
        element: ElementId,
        item: &Item,
    ) -> Result<()> {
        self.attach_media(element, item)
            .await
            .with_context(|| format!("fetching {}", item.id))?;

        let viewport = self.surface.viewport();
        let (target_width, _) = self.resting_size(item);
        let resting = self
            .surface
            .rect_if_width(element, target_width)
            .context("element left its lane before entering")?;
        let highlight = self.config.animation.highlight_scale;
        let anchor = anchor_for(&resting, highlight, &viewport);
        let footprint = scaled_rect(&resting, highlight, anchor);
        self.regions.reserve(slot, footprint).await;
        trace!(slot, id = %item.id, "region reserved");

        let anim = &self.config.animation;
        self.surface.set_elevated(element, true);
        tween(anim.entrance, anim.frame_interval, anim.easing, |t| {
            self.surface.set_width(element, target_width * t);
            self.surface
                .set_scale(element, 1.0 + (highlight - 1.0) * t);
        })
        .await;

        sleep(anim.hold).await;

        // Scale settles back while departed neighbors shrink away; both
        // must finish before the region frees.
        let settle = tween(anim.exit, anim.frame_interval, anim.easing, |t| {
            self.surface
                .set_scale(element, highlight + (1.0 - highlight) * t);
        });
        tokio::join!(settle, self.evict_departed(lane, element));

        self.regions.free(slot);
        self.surface.commit_resting(element);
        self.tracker.release(&item.id);
        self.cycles.fetch_add(1, Ordering::Relaxed);
        debug!(slot, lane, id = %item.id, "cycle complete");
        Ok(())
    }

    /// Pick a lane and a center-band sibling; soft-retry until one
    /// exists or the scheduler is cancelled. Returns `None` on
    /// cancellation, with the claim still held by the caller.
    async fn place_with_retry(
        &self,
        item: &Item,
        cancel: &CancellationToken,
    ) -> Option<(usize, ElementId)> {
        loop {
            if let Some(placed) = self.try_place(item) {
                return Some(placed);
            }
            trace!(id = %item.id, "no insertion candidate in band; retrying");
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = sleep(self.config.rotation.fill_pacing) => {}
            }
        }
    }

    fn try_place(&self, item: &Item) -> Option<(usize, ElementId)> {
        let (lane, sibling) = {
            let mut rng = self.rng.lock().expect("scheduler rng poisoned");
            let lane = rng.random_range(0..self.surface.lane_count());
            let candidates = self
                .surface
                .siblings_within_band(lane, self.config.placement.insertion_band);
            (lane, candidates.as_slice().choose(&mut *rng).copied()?)
        };
        let element = self
            .surface
            .place_before(lane, sibling, item, self.resting_height())?;
        Some((lane, element))
    }

    /// Shrink and drop every other element of the lane that sits fully
    /// beyond a viewport edge.
    async fn evict_departed(&self, lane: usize, own: ElementId) {
        let departed = self.surface.fully_off_screen(lane, own);
        if departed.is_empty() {
            return;
        }
        debug!(lane, count = departed.len(), "evicting departed elements");
        let anim = self.config.animation.clone();
        let mut animations = JoinSet::new();
        for evictee in departed {
            let surface = Arc::clone(&self.surface);
            let handles = Arc::clone(&self.handles);
            let exit = anim.exit;
            let frame = anim.frame_interval;
            let easing = anim.easing;
            animations.spawn(async move {
                let start = surface
                    .element_rect(evictee)
                    .map(|rect| rect.width)
                    .unwrap_or(0.0);
                tween(exit, frame, easing, |t| {
                    surface.set_width(evictee, start * (1.0 - t));
                })
                .await;
                if let Some(removed) = surface.remove_element(evictee) {
                    if let Some(handle) = removed.handle {
                        handles.release(&handle);
                    }
                }
            });
        }
        while let Some(joined) = animations.join_next().await {
            if let Err(err) = joined {
                warn!("eviction animation panicked: {err}");
            }
        }
    }

    async fn attach_media(&self, element: ElementId, item: &Item) -> Result<(), FetchError> {
        let bytes = self.source.fetch(item).await?;
        let ready = ensure_displayable(item.kind, &bytes);
        let handle = self.handles.bind(bytes);
        match ready {
            Ok(()) => {
                self.surface.set_handle(element, handle);
                Ok(())
            }
            Err(failure) => {
                self.handles.release(&handle);
                Err(failure)
            }
        }
    }

    fn apply_fetch_policy(&self, item: &Item, failure: &FetchError) {
        match failure {
            FetchError::Transport(_) => {
                debug!(id = %item.id, "item kept in rotation after transport failure");
                self.tracker.release(&item.id);
            }
            FetchError::Corrupt(_) => {
                warn!(id = %item.id, "undecodable item leaves rotation for good");
                self.tracker.discard(&item.id);
            }
        }
    }

    fn remove_and_release_element(&self, element: ElementId) {
        if let Some(removed) = self.surface.remove_element(element) {
            if let Some(handle) = removed.handle {
                self.handles.release(&handle);
            }
        }
    }

    fn ensure_runnable(&self) -> Result<()> {
        let band = self.config.placement.insertion_band;
        if band >= 0.5 {
            return Err(Error::InsertionBandTooWide(band).into());
        }
        Ok(())
    }

    fn resting_height(&self) -> f32 {
        self.surface.viewport().height * self.config.placement.item_height_percent / 100.0
    }

    fn resting_size(&self, item: &Item) -> (f32, f32) {
        target_size(item.width, item.height, self.resting_height())
    }

    /// Worker `slot` starts `slot / workers` of one full cycle late so
    /// the slots never pop in lockstep.
    fn stagger_delay(&self, slot: usize) -> Duration {
        let workers = self.config.rotation.workers.max(1);
        let anim = &self.config.animation;
        let full = anim.entrance + anim.hold + anim.exit;
        full.mul_f64(slot as f64 / workers as f64)
    }
}
