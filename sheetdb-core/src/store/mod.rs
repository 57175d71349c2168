//! The store: a registry of collections bound to one grid client.
//!
//! Collections are discovered from the spreadsheet's sheets when the store
//! opens, as unmaterialized shells. Their header and rows are only fetched
//! the first time an operation touches them (see [`Store::materialize`]).
//!
//! The store owns its registry; nothing is global, so several stores can
//! coexist (each with its own client). Operations take `&mut self` and run
//! their remote calls strictly one after another.

mod ops;

use tracing::{debug, info};

use crate::a1::{GridRange, HEADER_ROW};
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::grid::{GridClient, SheetProperties};
use crate::registry::Registry;

pub struct Store<G> {
    grid: G,
    registry: Registry,
}

impl<G: GridClient> Store<G> {
    /// Authenticates and registers one shell per existing sheet.
    pub async fn open(grid: G) -> Result<Self> {
        grid.authenticate().await?;
        let sheets = grid.list_sheets().await?;
        debug!(sheets = sheets.len(), "opened store");
        Ok(Self {
            grid,
            registry: Registry::from_sheets(sheets),
        })
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.registry.get(name)
    }

    pub fn collection_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Loads a collection's header and rows unless already loaded.
    ///
    /// A shell whose sheet has not been created yet has nothing to load and
    /// is left as is.
    pub async fn materialize(&mut self, name: &str) -> Result<()> {
        let collection = self
            .registry
            .get(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        if collection.is_initialized() {
            return Ok(());
        }
        let Some(sheet) = collection.sheet().cloned() else {
            return Ok(());
        };

        let loaded = load_collection(&self.grid, sheet).await?;
        self.registry.put(loaded);
        Ok(())
    }

    /// Reloads one collection from the remote sheet, ignoring cached state.
    pub async fn refresh_collection(&mut self, name: &str) -> Result<()> {
        if !self.registry.contains(name) {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        let sheet = self
            .grid
            .list_sheets()
            .await?
            .into_iter()
            .find(|s| s.title == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;

        let loaded = load_collection(&self.grid, sheet).await?;
        self.registry.put(loaded);
        info!(collection = name, "refreshed collection");
        Ok(())
    }

    /// Rebuilds the whole registry, loading every sheet from scratch.
    pub async fn refresh_all(&mut self) -> Result<()> {
        self.grid.authenticate().await?;
        let sheets = self.grid.list_sheets().await?;

        let mut registry = Registry::new();
        for sheet in sheets {
            registry.put(load_collection(&self.grid, sheet).await?);
        }
        info!(collections = registry.len(), "refreshed all collections");
        self.registry = registry;
        Ok(())
    }
}

/// Reads a sheet's used range and builds an initialized collection from it.
async fn load_collection<G: GridClient>(grid: &G, sheet: SheetProperties) -> Result<Collection> {
    if sheet.row_count == 0 || sheet.column_count == 0 {
        return Ok(Collection::from_grid(sheet, None));
    }

    let range = GridRange::rows(
        sheet.title.clone(),
        HEADER_ROW,
        sheet.row_count,
        sheet.column_count,
    );
    let address = range.to_a1()?;
    debug!(range = %address, "materializing collection");
    let rows = grid.read_range(&range).await?;
    Ok(Collection::from_grid(sheet, rows))
}
