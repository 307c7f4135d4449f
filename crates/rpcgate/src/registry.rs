//! Service registry
//!
//! Maps `Service.Method` keys to method descriptors. Registration takes the
//! write lock for the whole eligibility scan; lookups share the read lock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::ArgsPayload;
use crate::context::RequestContext;
use crate::error::{MethodError, RegistryError, ResolveError};
use crate::method::{
    Invokable, MethodEntry, MethodShape, MethodTable, Service, TypeDescriptor, base_type_name,
    is_exported,
};

/// Immutable record of one registered callable
pub struct MethodDescriptor {
    service: String,
    name: String,
    invokable: Arc<dyn Invokable>,
    args_type: Option<TypeDescriptor>,
    reply_type: Option<TypeDescriptor>,
    has_context_arg: bool,
}

impl MethodDescriptor {
    fn new(service: &str, entry: MethodEntry) -> Self {
        let shape = entry.invokable.shape();
        Self {
            service: service.to_string(),
            has_context_arg: entry.invokable.has_context_arg(),
            args_type: shape.args_type(),
            reply_type: shape.reply_type(),
            name: entry.name,
            invokable: entry.invokable,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Service.Method`
    pub fn key(&self) -> String {
        format!("{}.{}", self.service, self.name)
    }

    pub fn args_type(&self) -> Option<TypeDescriptor> {
        self.args_type
    }

    pub fn reply_type(&self) -> Option<TypeDescriptor> {
        self.reply_type
    }

    pub fn has_context_arg(&self) -> bool {
        self.has_context_arg
    }

    pub fn is_rpc(&self) -> bool {
        self.args_type.is_some()
    }

    pub async fn invoke(
        &self,
        ctx: &mut RequestContext,
        args: Option<ArgsPayload>,
    ) -> Result<Option<Value>, MethodError> {
        self.invokable.invoke(ctx, args).await
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("service", &self.service)
            .field("name", &self.name)
            .field("args_type", &self.args_type.map(|t| t.name()))
            .field("reply_type", &self.reply_type.map(|t| t.name()))
            .field("has_context_arg", &self.has_context_arg)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    services: BTreeMap<String, Vec<String>>,
    methods: HashMap<String, Arc<MethodDescriptor>>,
}

/// Append-only table of registered services and their methods
#[derive(Default)]
pub struct ServiceRegistry {
    state: RwLock<RegistryState>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every eligible method `receiver` declares.
    ///
    /// An empty `name` infers the service name from the receiver's type name,
    /// which must then be exported. Explicit names are used as given but may
    /// not contain `.`.
    pub fn register_service<S: Service>(&self, receiver: S, name: &str) -> Result<(), RegistryError> {
        self.register_shared_service(Arc::new(receiver), name)
    }

    /// Same as [`register_service`](Self::register_service) for a receiver that is
    /// already shared elsewhere
    pub fn register_shared_service<S: Service>(
        &self,
        receiver: Arc<S>,
        name: &str,
    ) -> Result<(), RegistryError> {
        let service_name = service_name_for::<S>(name)?;

        let mut table = MethodTable::new(receiver);
        S::register_methods(&mut table);

        self.insert(service_name, table.into_entries())
    }

    /// Register pre-built entries under an explicit name
    pub fn register_entries(
        &self,
        name: &str,
        entries: Vec<MethodEntry>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyServiceName(String::new()));
        }
        check_service_name(name)?;
        self.insert(name.to_string(), entries)
    }

    fn insert(&self, service: String, entries: Vec<MethodEntry>) -> Result<(), RegistryError> {
        let mut state = self.state.write();

        if state.services.contains_key(&service) {
            return Err(RegistryError::DuplicateService(service));
        }

        let mut names: Vec<String> = Vec::new();
        let mut admitted: Vec<Arc<MethodDescriptor>> = Vec::new();

        for entry in entries {
            if let Err(reason) = check_eligible(&entry) {
                debug!(service = %service, method = %entry.name, reason, "Skipping ineligible method");
                continue;
            }
            if names.contains(&entry.name) {
                warn!(
                    service = %service,
                    method = %entry.name,
                    "Method declared more than once, keeping the first declaration"
                );
                continue;
            }
            names.push(entry.name.clone());
            admitted.push(Arc::new(MethodDescriptor::new(&service, entry)));
        }

        if admitted.is_empty() {
            return Err(RegistryError::NoEligibleMethods(service));
        }

        for descriptor in admitted {
            state.methods.insert(descriptor.key(), descriptor);
        }
        info!(service = %service, methods = names.len(), "Registered service");
        state.services.insert(service, names);

        Ok(())
    }

    /// Look up the descriptor for a `Service.Method` key
    pub fn resolve(&self, method_key: &str) -> Result<Arc<MethodDescriptor>, ResolveError> {
        let (service, method) = split_method_key(method_key)?;

        let state = self.state.read();
        if !state.services.contains_key(service) {
            return Err(ResolveError::ServiceNotFound(service.to_string()));
        }
        state
            .methods
            .get(method_key)
            .cloned()
            .ok_or_else(|| ResolveError::MethodNotFound {
                service: service.to_string(),
                method: method.to_string(),
            })
    }

    /// Snapshot of service name to method names, in declaration order
    pub fn list_services(&self) -> BTreeMap<String, Vec<String>> {
        self.state.read().services.clone()
    }

    pub fn contains_service(&self, name: &str) -> bool {
        self.state.read().services.contains_key(name)
    }

    /// Number of registered methods across all services
    pub fn len(&self) -> usize {
        self.state.read().methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().methods.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.list_services())
            .finish()
    }
}

fn service_name_for<S>(explicit: &str) -> Result<String, RegistryError> {
    if !explicit.is_empty() {
        check_service_name(explicit)?;
        return Ok(explicit.to_string());
    }

    let type_name = std::any::type_name::<S>();
    let inferred = base_type_name(type_name);
    if inferred.is_empty() {
        return Err(RegistryError::EmptyServiceName(type_name.to_string()));
    }
    if !is_exported(inferred) {
        return Err(RegistryError::NameNotExported(inferred.to_string()));
    }
    Ok(inferred.to_string())
}

// `.` separates service from method in a key
fn check_service_name(name: &str) -> Result<(), RegistryError> {
    if name.contains('.') {
        return Err(RegistryError::InvalidServiceName(name.to_string()));
    }
    Ok(())
}

fn check_eligible(entry: &MethodEntry) -> Result<(), &'static str> {
    if !is_exported(&entry.name) {
        return Err("method name is not exported");
    }
    if entry.name.contains('.') {
        return Err("method name contains '.'");
    }
    if let MethodShape::Rpc { args, reply } = entry.invokable.shape() {
        if !args.is_exported() {
            return Err("argument type is not exported");
        }
        if !reply.is_exported() {
            return Err("reply type is not exported");
        }
    }
    Ok(())
}

/// Split `Service.Method` into its two non-empty halves
pub fn split_method_key(method_key: &str) -> Result<(&str, &str), ResolveError> {
    let mut parts = method_key.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(service), Some(method), None) if !service.is_empty() && !method.is_empty() => {
            Ok((service, method))
        }
        _ => Err(ResolveError::MalformedKey(method_key.to_string())),
    }
}
