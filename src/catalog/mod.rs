//! Session catalog: databases, session temp views, and global temp views.
//!
//! View names are stored case-preserved; the case policy is applied only at
//! lookup time. Session-scoped views live inside one [`SessionCatalog`];
//! global-scoped views live in a [`GlobalTempViews`] registry shared by
//! every catalog holding a handle to it. The registry is an explicit handle
//! rather than process state, so independent test runs can be isolated by
//! giving each its own registry.

use crate::plan::LogicalPlan;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Result type for catalog operations that may fail.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error type for catalog failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A database with this name already exists.
    DatabaseAlreadyExists { database: String },

    /// A session temp view with this name already exists.
    TempViewAlreadyExists { view: String },

    /// A global temp view with this name already exists.
    GlobalTempViewAlreadyExists { view: String },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::DatabaseAlreadyExists { database } => {
                write!(f, "database '{}' already exists", database)
            }
            CatalogError::TempViewAlreadyExists { view } => {
                write!(f, "temporary view '{}' already exists", view)
            }
            CatalogError::GlobalTempViewAlreadyExists { view } => {
                write!(f, "global temporary view '{}' already exists", view)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Metadata describing a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseDescriptor {
    pub name: SmolStr,
    pub location: String,
    pub properties: HashMap<String, String>,
}

impl DatabaseDescriptor {
    /// A database with empty location metadata and no properties.
    pub fn bare(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            location: String::new(),
            properties: HashMap::new(),
        }
    }
}

/// The scope a view binding lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    /// Visible only within the owning catalog.
    Session,
    /// Visible to every catalog sharing the registry.
    Global,
}

/// A successful view lookup: the stored (case-preserved) name, the bound
/// plan, and the namespace it was found in.
#[derive(Debug, Clone)]
pub struct ResolvedView {
    pub name: SmolStr,
    pub plan: Arc<LogicalPlan>,
    pub scope: ViewScope,
}

fn lookup_entry(
    map: &HashMap<SmolStr, Arc<LogicalPlan>>,
    name: &str,
    case_sensitive: bool,
) -> Option<(SmolStr, Arc<LogicalPlan>)> {
    if let Some((stored, plan)) = map.get_key_value(name) {
        return Some((stored.clone(), plan.clone()));
    }
    if case_sensitive {
        return None;
    }
    map.iter()
        .find(|(stored, _)| stored.eq_ignore_ascii_case(name))
        .map(|(stored, plan)| (stored.clone(), plan.clone()))
}

/// Registry of global-scope temp views, shared across catalogs by handle.
#[derive(Debug, Clone, Default)]
pub struct GlobalTempViews {
    views: Arc<RwLock<HashMap<SmolStr, Arc<LogicalPlan>>>>,
}

impl GlobalTempViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<SmolStr>,
        plan: LogicalPlan,
        override_if_exists: bool,
    ) -> CatalogResult<()> {
        let name = name.into();
        let mut views = self.write();
        if !override_if_exists && views.contains_key(&name) {
            return Err(CatalogError::GlobalTempViewAlreadyExists {
                view: name.to_string(),
            });
        }
        views.insert(name, Arc::new(plan));
        Ok(())
    }

    /// Looks up a view under the given case policy, returning the stored
    /// name alongside the plan.
    pub fn lookup(
        &self,
        name: &str,
        case_sensitive: bool,
    ) -> Option<(SmolStr, Arc<LogicalPlan>)> {
        lookup_entry(&self.read(), name, case_sensitive)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Stored names, case-preserved, in no particular order.
    pub fn names(&self) -> Vec<SmolStr> {
        self.read().keys().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SmolStr, Arc<LogicalPlan>>> {
        self.views.read().expect("global view registry poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SmolStr, Arc<LogicalPlan>>> {
        self.views.write().expect("global view registry poisoned")
    }
}

/// One session's catalog instance.
#[derive(Debug)]
pub struct SessionCatalog {
    databases: RwLock<HashMap<SmolStr, DatabaseDescriptor>>,
    temp_views: RwLock<HashMap<SmolStr, Arc<LogicalPlan>>>,
    global: GlobalTempViews,
}

impl SessionCatalog {
    /// Creates a catalog attached to the given global view registry.
    pub fn new(global: GlobalTempViews) -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
            temp_views: RwLock::new(HashMap::new()),
            global,
        }
    }

    /// Registers a database.
    ///
    /// Unlike view registration there is no override mode: an existing
    /// database of the same name is an error unless `ignore_if_exists`.
    pub fn create_database(
        &self,
        descriptor: DatabaseDescriptor,
        ignore_if_exists: bool,
    ) -> CatalogResult<()> {
        let mut databases = self.databases.write().expect("catalog lock poisoned");
        if databases.contains_key(&descriptor.name) {
            if ignore_if_exists {
                return Ok(());
            }
            return Err(CatalogError::DatabaseAlreadyExists {
                database: descriptor.name.to_string(),
            });
        }
        databases.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn database(&self, name: &str) -> Option<DatabaseDescriptor> {
        self.databases
            .read()
            .expect("catalog lock poisoned")
            .get(name)
            .cloned()
    }

    /// Registers a session-scoped temp view.
    pub fn create_temp_view(
        &self,
        name: impl Into<SmolStr>,
        plan: LogicalPlan,
        override_if_exists: bool,
    ) -> CatalogResult<()> {
        let name = name.into();
        let mut views = self.temp_views.write().expect("catalog lock poisoned");
        if !override_if_exists && views.contains_key(&name) {
            return Err(CatalogError::TempViewAlreadyExists {
                view: name.to_string(),
            });
        }
        views.insert(name, Arc::new(plan));
        Ok(())
    }

    /// Registers a global-scoped temp view in the shared registry.
    pub fn create_global_temp_view(
        &self,
        name: impl Into<SmolStr>,
        plan: LogicalPlan,
        override_if_exists: bool,
    ) -> CatalogResult<()> {
        self.global.register(name, plan, override_if_exists)
    }

    /// Resolves a view name under the given case policy.
    ///
    /// The session namespace shadows the global one.
    pub fn lookup_view(&self, name: &str, case_sensitive: bool) -> Option<ResolvedView> {
        let session = {
            let views = self.temp_views.read().expect("catalog lock poisoned");
            lookup_entry(&views, name, case_sensitive)
        };
        if let Some((stored, plan)) = session {
            return Some(ResolvedView {
                name: stored,
                plan,
                scope: ViewScope::Session,
            });
        }
        self.global
            .lookup(name, case_sensitive)
            .map(|(stored, plan)| ResolvedView {
                name: stored,
                plan,
                scope: ViewScope::Global,
            })
    }

    pub fn temp_view_count(&self) -> usize {
        self.temp_views.read().expect("catalog lock poisoned").len()
    }

    /// The shared global registry handle.
    pub fn global_views(&self) -> &GlobalTempViews {
        &self.global
    }
}
