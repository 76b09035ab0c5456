//! Configuration session for one catalogue item at a time.
//!
//! The item, its default accessories and its optional accessories are loaded
//! by three independent [`Loader`]s keyed on the active item id, while the
//! capability probe runs alongside them. Selection, quantity, capability and
//! view mode belong to the active item and are reset whenever it changes.

use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{Accessory, AccessoryId, CapabilityState, Item, ItemId, Quantity, ViewMode},
    protocol::DraftRecord,
};
use storage::DraftStore;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::{
    catalog::{accessories_transform, item_transform, CatalogClient},
    error::ConfiguratorError,
    fetch::{Loader, Resource},
    pricing::{aggregate, selected_optionals, PriceBreakdown},
    probe::CapabilityProbe,
    selection::SelectionSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Item,
    DefaultAccessories,
    OptionalAccessories,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfiguratorEvent {
    ItemSelected(Option<ItemId>),
    SourceSettled {
        source: DataSource,
        failed: bool,
    },
    CapabilityResolved {
        item_id: ItemId,
        state: CapabilityState,
    },
    SelectionChanged {
        accessory_id: AccessoryId,
        selected: bool,
    },
    QuantityChanged(Quantity),
    ViewModeChanged(ViewMode),
    DraftCommitted {
        entries: usize,
    },
}

/// Everything a presentation layer needs to render the current session.
#[derive(Debug, Clone)]
pub struct ConfiguratorView {
    pub item_id: Option<ItemId>,
    pub item: Resource<Item>,
    pub default_accessories: Resource<Vec<Accessory>>,
    pub optional_accessories: Resource<Vec<Accessory>>,
    pub selection: SelectionSet,
    pub selected_optional_accessories: Vec<Accessory>,
    pub quantity: Quantity,
    pub capability: CapabilityState,
    pub view_mode: ViewMode,
    /// Present once the item itself is loaded. Accessory lists that are still
    /// loading or failed count as empty.
    pub breakdown: Option<PriceBreakdown>,
    pub model_url: Option<String>,
    pub ar_viewer_url: Option<String>,
}

impl ConfiguratorView {
    pub fn is_selected(&self, accessory_id: AccessoryId) -> bool {
        self.selection.contains(accessory_id)
    }
}

struct ItemContext {
    item_id: Option<ItemId>,
    selection: SelectionSet,
    quantity: Quantity,
    capability: CapabilityState,
    view_mode: ViewMode,
    probe_generation: u64,
    probe_token: Option<CancellationToken>,
}

impl ItemContext {
    fn new() -> Self {
        Self {
            item_id: None,
            selection: SelectionSet::new(),
            quantity: Quantity::default(),
            capability: CapabilityState::default(),
            view_mode: ViewMode::default(),
            probe_generation: 0,
            probe_token: None,
        }
    }

    fn supersede_probe(&mut self) {
        self.probe_generation += 1;
        if let Some(token) = self.probe_token.take() {
            token.cancel();
        }
    }
}

pub struct Configurator {
    catalog: CatalogClient,
    probe: CapabilityProbe,
    drafts: DraftStore,
    scope: CancellationToken,
    item: Loader<Item>,
    default_accessories: Loader<Vec<Accessory>>,
    optional_accessories: Loader<Vec<Accessory>>,
    inner: Arc<Mutex<ItemContext>>,
    events: broadcast::Sender<ConfiguratorEvent>,
    _cancel_on_drop: DropGuard,
}

impl Configurator {
    /// Must be called from within a Tokio runtime.
    pub fn new(catalog: CatalogClient, probe: CapabilityProbe, drafts: DraftStore) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        let scope = CancellationToken::new();
        let http = catalog.http().clone();

        let configurator = Self {
            item: Loader::new(http.clone(), &scope),
            default_accessories: Loader::new(http.clone(), &scope),
            optional_accessories: Loader::new(http, &scope),
            catalog,
            probe,
            drafts,
            inner: Arc::new(Mutex::new(ItemContext::new())),
            events,
            _cancel_on_drop: scope.clone().drop_guard(),
            scope,
        };

        configurator.forward_settled(DataSource::Item, configurator.item.subscribe());
        configurator.forward_settled(
            DataSource::DefaultAccessories,
            configurator.default_accessories.subscribe(),
        );
        configurator.forward_settled(
            DataSource::OptionalAccessories,
            configurator.optional_accessories.subscribe(),
        );
        configurator.prune_selection_on_reload();

        Arc::new(configurator)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConfiguratorEvent> {
        self.events.subscribe()
    }

    pub fn item_updates(&self) -> watch::Receiver<Resource<Item>> {
        self.item.subscribe()
    }

    pub fn default_accessories_updates(&self) -> watch::Receiver<Resource<Vec<Accessory>>> {
        self.default_accessories.subscribe()
    }

    pub fn optional_accessories_updates(&self) -> watch::Receiver<Resource<Vec<Accessory>>> {
        self.optional_accessories.subscribe()
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    /// Makes `item_id` the active item. Selecting the item that is already
    /// active does nothing and returns `false`.
    pub async fn select_item(&self, item_id: ItemId) -> bool {
        self.rebind(Some(item_id)).await
    }

    /// Drops the active item; every source goes back to idle.
    pub async fn clear_item(&self) -> bool {
        self.rebind(None).await
    }

    async fn rebind(&self, item_id: Option<ItemId>) -> bool {
        let mut ctx = self.inner.lock().await;
        if ctx.item_id == item_id {
            return false;
        }

        ctx.item_id = item_id;
        ctx.selection.reset();
        ctx.view_mode = ViewMode::FlatImage;
        ctx.capability = CapabilityState::Unknown;
        ctx.supersede_probe();

        self.item
            .load(item_id.map(|id| self.catalog.item_url(id)), item_transform())
            .await;
        self.default_accessories
            .load(
                item_id.map(|id| self.catalog.default_accessories_url(id)),
                accessories_transform(),
            )
            .await;
        self.optional_accessories
            .load(
                item_id.map(|id| self.catalog.optional_accessories_url(id)),
                accessories_transform(),
            )
            .await;

        if let Some(item_id) = item_id {
            ctx.capability.advance(CapabilityState::Checking);
            self.spawn_probe(&mut ctx, item_id);
        }

        info!(item_id = ?item_id.map(|id| id.0), "item selected");
        let _ = self.events.send(ConfiguratorEvent::ItemSelected(item_id));
        true
    }

    fn spawn_probe(&self, ctx: &mut ItemContext, item_id: ItemId) {
        let generation = ctx.probe_generation;
        let token = self.scope.child_token();
        ctx.probe_token = Some(token.clone());

        let probe = self.probe.clone();
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                state = probe.probe(item_id) => Some(state),
            };
            let Some(outcome) = outcome else {
                debug!(item_id = %item_id, "capability probe cancelled");
                return;
            };

            let mut ctx = inner.lock().await;
            if ctx.probe_generation != generation || token.is_cancelled() {
                debug!(item_id = %item_id, "discarding superseded capability probe");
                return;
            }
            if ctx.capability.advance(outcome) {
                let _ = events.send(ConfiguratorEvent::CapabilityResolved {
                    item_id,
                    state: outcome,
                });
            }
        });
    }

    fn forward_settled<T>(&self, source: DataSource, mut updates: watch::Receiver<Resource<T>>)
    where
        T: Send + Sync + 'static,
    {
        let scope = self.scope.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = scope.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let settled = {
                            let resource = updates.borrow_and_update();
                            resource
                                .is_settled()
                                .then(|| resource.error.is_some())
                        };
                        if let Some(failed) = settled {
                            let _ = events.send(ConfiguratorEvent::SourceSettled { source, failed });
                        }
                    }
                }
            }
        });
    }

    /// Keeps the selection a subset of the optional collection whenever a
    /// new collection is published for the active item.
    fn prune_selection_on_reload(&self) {
        let scope = self.scope.clone();
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let mut updates = self.optional_accessories.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = scope.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let offered: Option<Vec<AccessoryId>> = updates
                            .borrow_and_update()
                            .data
                            .as_ref()
                            .map(|optionals| optionals.iter().map(|a| a.id).collect());
                        let Some(offered) = offered else {
                            continue;
                        };

                        let mut ctx = inner.lock().await;
                        let withdrawn: Vec<AccessoryId> = ctx
                            .selection
                            .iter()
                            .filter(|id| !offered.contains(id))
                            .collect();
                        ctx.selection.retain(|id| offered.contains(id));
                        for accessory_id in withdrawn {
                            debug!(accessory_id = %accessory_id, "dropping accessory that is no longer offered");
                            let _ = events.send(ConfiguratorEvent::SelectionChanged {
                                accessory_id,
                                selected: false,
                            });
                        }
                    }
                }
            }
        });
    }

    /// Flips an optional accessory in or out of the selection. Ids that are
    /// not part of the loaded optional collection are ignored.
    pub async fn toggle_accessory(&self, accessory_id: AccessoryId) -> bool {
        let mut ctx = self.inner.lock().await;
        let offered = self
            .optional_accessories
            .snapshot()
            .data
            .is_some_and(|optionals| optionals.iter().any(|a| a.id == accessory_id));
        if !offered {
            debug!(accessory_id = %accessory_id, "ignoring toggle of an accessory that is not offered");
            return false;
        }

        let selected = ctx.selection.toggle(accessory_id);
        let _ = self.events.send(ConfiguratorEvent::SelectionChanged {
            accessory_id,
            selected,
        });
        selected
    }

    /// Applies raw text typed into the quantity field.
    pub async fn set_quantity_input(&self, raw: &str) -> Quantity {
        self.apply_quantity(Quantity::from_input(raw)).await
    }

    pub async fn set_quantity(&self, value: i64) -> Quantity {
        self.apply_quantity(Quantity::new(value)).await
    }

    async fn apply_quantity(&self, quantity: Quantity) -> Quantity {
        let mut ctx = self.inner.lock().await;
        if ctx.quantity != quantity {
            ctx.quantity = quantity;
            let _ = self.events.send(ConfiguratorEvent::QuantityChanged(quantity));
        }
        quantity
    }

    pub async fn toggle_view_mode(&self) -> ViewMode {
        let mut ctx = self.inner.lock().await;
        let next = match ctx.view_mode {
            ViewMode::FlatImage => ViewMode::Interactive3d,
            ViewMode::Interactive3d => ViewMode::FlatImage,
        };
        self.apply_view_mode(&mut ctx, next);
        ctx.view_mode
    }

    /// Returns whether the requested mode is now active. Interactive 3D is
    /// refused until the capability probe reported an available asset.
    pub async fn set_view_mode(&self, mode: ViewMode) -> bool {
        let mut ctx = self.inner.lock().await;
        self.apply_view_mode(&mut ctx, mode);
        ctx.view_mode == mode
    }

    fn apply_view_mode(&self, ctx: &mut ItemContext, mode: ViewMode) {
        if mode == ViewMode::Interactive3d && ctx.capability != CapabilityState::Available {
            debug!(capability = ?ctx.capability, "interactive view is not available");
            return;
        }
        if ctx.view_mode != mode {
            ctx.view_mode = mode;
            let _ = self.events.send(ConfiguratorEvent::ViewModeChanged(mode));
        }
    }

    /// Re-issues one data source for the active item.
    pub async fn refetch(&self, source: DataSource) -> bool {
        let _ctx = self.inner.lock().await;
        match source {
            DataSource::Item => self.item.refetch().await,
            DataSource::DefaultAccessories => self.default_accessories.refetch().await,
            DataSource::OptionalAccessories => self.optional_accessories.refetch().await,
        }
    }

    pub async fn snapshot(&self) -> ConfiguratorView {
        let ctx = self.inner.lock().await;
        let item = self.item.snapshot();
        let default_accessories = self.default_accessories.snapshot();
        let optional_accessories = self.optional_accessories.snapshot();

        let mut selection = ctx.selection.clone();
        if let Some(optionals) = optional_accessories.data.as_deref() {
            selection.retain(|id| optionals.iter().any(|a| a.id == *id));
        }
        let selected_optional_accessories = optional_accessories
            .data
            .as_deref()
            .map(|optionals| selected_optionals(optionals, &selection))
            .unwrap_or_default();
        let breakdown = item.data.as_ref().map(|item| {
            aggregate(
                item.unit_price,
                default_accessories.data.as_deref().unwrap_or_default(),
                &selected_optional_accessories,
                ctx.quantity,
            )
        });

        let (model_url, ar_viewer_url) = match (ctx.item_id, ctx.capability) {
            (Some(item_id), CapabilityState::Available) => (
                Some(self.probe.model_url(item_id)),
                Some(self.probe.ar_viewer_url(item_id)),
            ),
            _ => (None, None),
        };

        ConfiguratorView {
            item_id: ctx.item_id,
            item,
            default_accessories,
            optional_accessories,
            selection,
            selected_optional_accessories,
            quantity: ctx.quantity,
            capability: ctx.capability,
            view_mode: ctx.view_mode,
            breakdown,
            model_url,
            ar_viewer_url,
        }
    }

    /// Appends the current configuration to the draft store.
    pub async fn commit(&self) -> Result<DraftRecord, ConfiguratorError> {
        let view = self.snapshot().await;
        let (Some(item), Some(breakdown)) = (view.item.data, view.breakdown) else {
            return Err(ConfiguratorError::NoActiveItem);
        };

        let draft = DraftRecord {
            item_name: item.name,
            item_image: item.image,
            quantity: view.quantity,
            optional_accessories: view.selected_optional_accessories,
            default_accessories: view.default_accessories.data.unwrap_or_default(),
            total_price: breakdown.total,
            committed_at: Some(Utc::now()),
        };
        let entries = self.drafts.append(&draft).await?;

        info!(
            item_id = %item.id,
            total = %draft.total_price,
            entries,
            "configuration committed"
        );
        let _ = self
            .events
            .send(ConfiguratorEvent::DraftCommitted { entries });
        Ok(draft)
    }

    /// Cancels every in-flight fetch and probe. Results that arrive later are
    /// discarded.
    pub fn close(&self) {
        self.scope.cancel();
    }
}

#[cfg(test)]
#[path = "tests/configurator_tests.rs"]
mod tests;
