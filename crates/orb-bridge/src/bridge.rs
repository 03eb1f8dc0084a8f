// SPDX-License-Identifier: MIT OR Apache-2.0
//! The bridge: registration tables and request dispatch.

use orb_codec::{
    FixupApplier, RefKind, ReferenceBinder, SerializerConfig, SerializerRegistry, SerializerState,
};
use orb_core::{
    CallContext, ClassSchema, FixUp, Instance, NativeValue, TypeDesc, TypeRegistry,
};
use orb_error::RpcError;
use orb_protocol::{JsonRpcRequest, JsonRpcResult, MethodName};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::analyzer::{ClassAnalyzer, MethodEntry, MethodKey};
use crate::callbacks::CallbackController;
use crate::local_args::LocalArgController;
use crate::resolve;
use crate::{BridgeError, RegistrationError};

// ---------------------------------------------------------------------------
// Registration tables
// ---------------------------------------------------------------------------

/// A registered object: the live instance plus the declared interface that
/// limits which methods are exposed.
#[derive(Clone)]
pub struct ObjectInstance {
    /// The live instance.
    pub instance: Arc<Instance>,
    /// The declared interface; assignable-from the instance's class.
    pub interface: Arc<ClassSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ObjectKey {
    Name(String),
    Handle(i64),
}

#[derive(Default)]
struct Tables {
    objects: BTreeMap<ObjectKey, ObjectInstance>,
    classes: BTreeMap<String, Arc<ClassSchema>>,
    reference_classes: BTreeSet<String>,
    callable_reference_classes: BTreeSet<String>,
    reference_map: BTreeMap<i64, Arc<Instance>>,
    // Instance identity → handle, so the same native keeps its handle
    // across requests.  Keys stay valid because reference_map holds the
    // instance alive.
    handle_by_identity: HashMap<usize, i64>,
    references_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Global,
    Session,
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Registration and dispatch unit.
///
/// Construct one [global](Bridge::global) bridge per process (explicit and
/// injectable, so tests can build isolated instances) and a
/// [session](Bridge::session) bridge per client scope.  All registration
/// tables live behind one short-held mutex; codec work never runs inside
/// it.
pub struct Bridge {
    scope: Scope,
    global: Option<Arc<Bridge>>,
    types: Arc<TypeRegistry>,
    serializers: Arc<SerializerRegistry>,
    config: SerializerConfig,
    tables: Mutex<Tables>,
    next_handle: AtomicI64,
    local_args: LocalArgController,
    callbacks: CallbackController,
}

enum CallTarget {
    Object(ObjectInstance),
    Class(Arc<ClassSchema>),
}

impl Bridge {
    /// The process-wide bridge holding default registrations.
    #[must_use]
    pub fn global(types: Arc<TypeRegistry>) -> Arc<Self> {
        Self::global_with_config(types, SerializerConfig::default())
    }

    /// A global bridge with explicit serializer settings.
    #[must_use]
    pub fn global_with_config(types: Arc<TypeRegistry>, config: SerializerConfig) -> Arc<Self> {
        let serializers = Arc::new(SerializerRegistry::with_defaults(types.clone()));
        Arc::new(Self {
            scope: Scope::Global,
            global: None,
            types,
            serializers,
            config,
            tables: Mutex::new(Tables::default()),
            next_handle: AtomicI64::new(1),
            local_args: LocalArgController::new(),
            callbacks: CallbackController::new(),
        })
    }

    /// A session bridge delegating unresolved lookups to `global`.
    #[must_use]
    pub fn session(global: &Arc<Bridge>) -> Arc<Self> {
        Self::session_with_config(global, global.config.clone())
    }

    /// A session bridge with its own serializer settings.
    #[must_use]
    pub fn session_with_config(global: &Arc<Bridge>, config: SerializerConfig) -> Arc<Self> {
        Arc::new(Self {
            scope: Scope::Session,
            global: Some(global.clone()),
            types: global.types.clone(),
            serializers: global.serializers.clone(),
            config,
            tables: Mutex::new(Tables::default()),
            next_handle: AtomicI64::new(1),
            local_args: LocalArgController::new(),
            callbacks: CallbackController::new(),
        })
    }

    /// The shared type declarations.
    #[must_use]
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// The codec registry (immutable after construction).
    #[must_use]
    pub fn serializers(&self) -> &Arc<SerializerRegistry> {
        &self.serializers
    }

    /// The context-resolved parameter table of this bridge.
    #[must_use]
    pub fn local_args(&self) -> &LocalArgController {
        &self.local_args
    }

    /// The invocation hook table of this bridge.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackController {
        &self.callbacks
    }

    // -- Registration ----------------------------------------------------

    /// Register (upsert) an object under `name`, exposing the methods of
    /// its own class.
    ///
    /// # Errors
    ///
    /// Never fails for the own-class form; the `Result` mirrors
    /// [`Self::register_object_as`].
    pub fn register_object(
        &self,
        name: &str,
        instance: Arc<Instance>,
    ) -> Result<(), RegistrationError> {
        let interface = instance.class().clone();
        self.register_object_as(name, instance, interface)
    }

    /// Register (upsert) an object under `name`, exposing only the methods
    /// of `interface`.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::InterfaceMismatch`] when `interface` is not
    /// assignable from the instance's class.
    pub fn register_object_as(
        &self,
        name: &str,
        instance: Arc<Instance>,
        interface: Arc<ClassSchema>,
    ) -> Result<(), RegistrationError> {
        if !interface.assignable_from(instance.class()) {
            return Err(RegistrationError::InterfaceMismatch {
                interface: interface.name.clone(),
                class: instance.class().name.clone(),
            });
        }
        self.types.record_class(
            instance.class().name.clone(),
            instance.class().implements.clone(),
        );
        let mut tables = self.lock_tables();
        tables.objects.insert(
            ObjectKey::Name(name.to_owned()),
            ObjectInstance {
                instance,
                interface,
            },
        );
        Ok(())
    }

    /// Remove the object registered under `name`; silent when absent.
    pub fn unregister_object(&self, name: &str) {
        self.lock_tables()
            .objects
            .remove(&ObjectKey::Name(name.to_owned()));
    }

    /// Look up a registered object by name (this bridge only).
    #[must_use]
    pub fn lookup_object(&self, name: &str) -> Option<ObjectInstance> {
        self.lock_tables()
            .objects
            .get(&ObjectKey::Name(name.to_owned()))
            .cloned()
    }

    /// Register a class under `name`, exposing its static methods.
    /// Idempotent for the same schema.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::NameConflict`] when a different schema is
    /// already bound.
    pub fn register_class(
        &self,
        name: &str,
        schema: Arc<ClassSchema>,
    ) -> Result<(), RegistrationError> {
        self.types
            .record_class(schema.name.clone(), schema.implements.clone());
        let mut tables = self.lock_tables();
        match tables.classes.get(name) {
            Some(existing) if Arc::ptr_eq(existing, &schema) => Ok(()),
            Some(_) => Err(RegistrationError::NameConflict {
                name: name.to_owned(),
            }),
            None => {
                tables.classes.insert(name.to_owned(), schema);
                Ok(())
            }
        }
    }

    /// Remove the class registered under `name`; silent when absent.
    pub fn unregister_class(&self, name: &str) {
        self.lock_tables().classes.remove(name);
    }

    /// Look up a registered class by name (this bridge only).
    #[must_use]
    pub fn lookup_class(&self, name: &str) -> Option<Arc<ClassSchema>> {
        self.lock_tables().classes.get(name).cloned()
    }

    /// Register `class` for reference substitution: instances marshal as
    /// opaque handles instead of expanding.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::ScopeError`] on the global bridge.
    pub fn register_reference(&self, class: &Arc<ClassSchema>) -> Result<(), RegistrationError> {
        self.register_reference_class(class, false)
    }

    /// Register `class` for callable-reference substitution: the handle is
    /// itself invocable via the `.obj#N.m` form.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::ScopeError`] on the global bridge.
    pub fn register_callable_reference(
        &self,
        class: &Arc<ClassSchema>,
    ) -> Result<(), RegistrationError> {
        self.register_reference_class(class, true)
    }

    fn register_reference_class(
        &self,
        class: &Arc<ClassSchema>,
        callable: bool,
    ) -> Result<(), RegistrationError> {
        if self.scope == Scope::Global {
            return Err(RegistrationError::ScopeError);
        }
        self.types
            .record_class(class.name.clone(), class.implements.clone());
        let mut tables = self.lock_tables();
        if callable {
            tables.callable_reference_classes.insert(class.name.clone());
        } else {
            tables.reference_classes.insert(class.name.clone());
        }
        tables.references_enabled = true;
        Ok(())
    }

    /// Remove `name` from the reference class set; silent when absent.
    pub fn unregister_reference(&self, name: &str) {
        self.lock_tables().reference_classes.remove(name);
    }

    /// Remove `name` from the callable-reference class set; silent when
    /// absent.
    pub fn unregister_callable_reference(&self, name: &str) {
        self.lock_tables().callable_reference_classes.remove(name);
    }

    /// Whether any reference class has been registered on this bridge.
    #[must_use]
    pub fn references_enabled(&self) -> bool {
        self.lock_tables().references_enabled
    }

    /// Drop a minted handle.  Later uses of the handle fail with a stale
    /// handle error.
    pub fn unregister_handle(&self, handle: i64) {
        let mut tables = self.lock_tables();
        if let Some(instance) = tables.reference_map.remove(&handle) {
            tables
                .handle_by_identity
                .remove(&(Arc::as_ptr(&instance) as usize));
        }
        tables.objects.remove(&ObjectKey::Handle(handle));
    }

    // -- Dispatch --------------------------------------------------------

    /// Dispatch a decoded request and produce the result envelope.
    ///
    /// Every failure is recovered here and converted into an error
    /// envelope; this method does not panic or return `Err`.
    pub fn call(self: &Arc<Self>, ctx: &CallContext, request: &Value) -> JsonRpcResult {
        let req = match JsonRpcRequest::from_value(request) {
            Ok(req) => req,
            Err(e) => {
                let id = request.get("id").cloned().unwrap_or(Value::Null);
                return JsonRpcResult::failure(
                    id,
                    BridgeError::Parse(e.to_string()).to_rpc_error(),
                );
            }
        };
        let id = req.id.clone();
        debug!(target: "orb.bridge", method = %req.method, params = req.params.len(), "dispatching");
        match self.dispatch(ctx, req) {
            Ok((result, fixups)) => JsonRpcResult::success(id, result, fixups),
            Err(error) => {
                debug!(target: "orb.bridge", %error, "dispatch failed");
                JsonRpcResult::failure(id, error.to_rpc_error())
            }
        }
    }

    fn dispatch(
        self: &Arc<Self>,
        ctx: &CallContext,
        req: JsonRpcRequest,
    ) -> Result<(Value, Vec<FixUp>), BridgeError> {
        // 1. Inbound fixups against the params tree (shape restoration).
        let mut params = req.params;
        if !req.fixups.is_empty() {
            let mut envelope = json!({ "params": Value::Array(params) });
            FixupApplier::apply_to_tree(&mut envelope, &req.fixups)
                .map_err(|e| BridgeError::Fixup(e.to_string()))?;
            params = match envelope.get_mut("params").map(Value::take) {
                Some(Value::Array(items)) => items,
                _ => return Err(BridgeError::Fixup("params slot vanished".into())),
            };
        }

        // 2. Method-name parse and target lookup.
        let method = MethodName::parse(&req.method)
            .map_err(|e| BridgeError::NoMethod(e.to_string()))?;
        match method {
            MethodName::SystemListMethods => {
                if !params.is_empty() {
                    return Err(BridgeError::NoMethod(
                        "system.listMethods takes no arguments".into(),
                    ));
                }
                let names = self
                    .list_methods()
                    .into_iter()
                    .map(Value::String)
                    .collect();
                Ok((Value::Array(names), Vec::new()))
            }
            MethodName::Object { handle, method } => {
                let instance = self.resolve_handle(handle).ok_or_else(|| {
                    BridgeError::NoMethod(format!(".obj#{handle} is not a known reference"))
                })?;
                if method == "listMethods" {
                    if !params.is_empty() {
                        return Err(BridgeError::NoMethod(
                            "listMethods takes no arguments".into(),
                        ));
                    }
                    return Ok((self.referenced_method_names(&instance), Vec::new()));
                }
                let data = ClassAnalyzer::analyze(instance.class());
                self.invoke(
                    ctx,
                    Some(instance),
                    data.method_map(),
                    &method,
                    &params,
                    &req.fixups,
                )
            }
            MethodName::Named { target, method } => {
                match self.resolve_named(&target) {
                    Some(CallTarget::Object(oi)) => {
                        let data = ClassAnalyzer::analyze(&oi.interface);
                        self.invoke(
                            ctx,
                            Some(oi.instance),
                            data.method_map(),
                            &method,
                            &params,
                            &req.fixups,
                        )
                    }
                    Some(CallTarget::Class(schema)) => {
                        let data = ClassAnalyzer::analyze(&schema);
                        self.invoke(
                            ctx,
                            None,
                            data.static_method_map(),
                            &method,
                            &params,
                            &req.fixups,
                        )
                    }
                    None => Err(BridgeError::NoMethod(format!(
                        "{target} is not a registered object or class"
                    ))),
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn invoke(
        self: &Arc<Self>,
        ctx: &CallContext,
        instance: Option<Arc<Instance>>,
        map: &BTreeMap<MethodKey, MethodEntry>,
        method_name: &str,
        params: &[Value],
        inbound_fixups: &[FixUp],
    ) -> Result<(Value, Vec<FixUp>), BridgeError> {
        let ctx_type = ctx.context_type();
        let is_local = |p: &TypeDesc| self.is_local_param(p, ctx_type);

        // 3. Candidates by (name, wire arity), then overload resolution.
        let mut candidates = Vec::new();
        for (key, entry) in map {
            if key.name != method_name {
                continue;
            }
            for method in entry.iter() {
                let wire_arity = resolve::wire_params(method, &is_local).len();
                if wire_arity == params.len() {
                    candidates.push(method.clone());
                }
            }
        }
        if candidates.is_empty() {
            return Err(BridgeError::NoMethod(format!(
                "{method_name} with {} argument(s)",
                params.len()
            )));
        }
        let mut probe_state = SerializerState::new(self.config.clone()).with_binder(self.binder());
        let chosen = resolve::select(
            &self.serializers,
            &mut probe_state,
            &self.types,
            candidates,
            params,
            &is_local,
        )?;

        // 4. Unmarshal wire arguments, then restore inbound graph identity.
        let mut state = SerializerState::new(self.config.clone()).with_binder(self.binder());
        let wire_types = resolve::wire_params(&chosen, &is_local);
        let mut wire_args = Vec::with_capacity(wire_types.len());
        for (index, (target, node)) in wire_types.iter().zip(params.iter()).enumerate() {
            let native = self
                .serializers
                .unmarshal(&mut state, target, node)
                .map_err(|e| BridgeError::Unmarshal(format!("arg {index}: {e}")))?;
            wire_args.push(native);
        }
        if !inbound_fixups.is_empty() {
            let wrapper = NativeValue::list(wire_args);
            FixupApplier::relink("params", &wrapper, inbound_fixups)
                .map_err(|e| BridgeError::Fixup(e.to_string()))?;
            let NativeValue::List(items) = wrapper else {
                return Err(BridgeError::Fixup("params wrapper vanished".into()));
            };
            wire_args = items.take();
        }

        // Inject context-resolved slots at their declared positions.
        let mut args = Vec::with_capacity(chosen.params.len());
        let mut wire_iter = wire_args.into_iter();
        for param in &chosen.params {
            if is_local(param) {
                let value = self
                    .resolve_local(param, ctx)
                    .ok_or_else(|| {
                        BridgeError::Unmarshal(format!("no resolver for context arg {param}"))
                    })?
                    .map_err(|e| {
                        BridgeError::Unmarshal(format!("context arg {param}: {e}"))
                    })?;
                args.push(value);
            } else {
                let value = wire_iter.next().ok_or_else(|| {
                    BridgeError::Unmarshal("wire arity mismatch after injection".into())
                })?;
                args.push(value);
            }
        }

        // 5.–8. Hooks, invocation, marshal.
        self.callbacks
            .fire_pre(ctx, instance.as_ref(), &chosen, &args)
            .map_err(|e| {
                self.report_error(ctx, instance.as_ref(), &chosen, &e.to_string());
                BridgeError::Remote {
                    msg: e.to_string(),
                    trace: None,
                }
            })?;

        let result = (chosen.handler)(ctx, instance.as_ref(), args).map_err(|e| {
            let error = BridgeError::Remote {
                msg: e.to_string(),
                trace: Some(format!("{e:?}")),
            };
            self.callbacks
                .fire_error(ctx, instance.as_ref(), &chosen, &error.to_rpc_error());
            error
        })?;

        self.callbacks
            .fire_post(ctx, instance.as_ref(), &chosen, &result)
            .map_err(|e| {
                self.report_error(ctx, instance.as_ref(), &chosen, &e.to_string());
                BridgeError::Remote {
                    msg: e.to_string(),
                    trace: None,
                }
            })?;

        let mut marshal_state =
            SerializerState::with_root(self.config.clone(), "result").with_binder(self.binder());
        let result_json = self
            .serializers
            .marshal(&mut marshal_state, &result)
            .map_err(|e| BridgeError::Marshal(e.to_string()))?;
        Ok((result_json, marshal_state.take_fixups()))
    }

    fn report_error(
        &self,
        ctx: &CallContext,
        instance: Option<&Arc<Instance>>,
        method: &Arc<orb_core::MethodDef>,
        msg: &str,
    ) {
        let error = RpcError::new(orb_error::ErrorCode::RemoteException, msg.to_owned());
        self.callbacks.fire_error(ctx, instance, method, &error);
    }

    // -- Lookup helpers --------------------------------------------------

    fn resolve_named(&self, name: &str) -> Option<CallTarget> {
        {
            let tables = self.lock_tables();
            if let Some(oi) = tables.objects.get(&ObjectKey::Name(name.to_owned())) {
                return Some(CallTarget::Object(oi.clone()));
            }
            if let Some(schema) = tables.classes.get(name) {
                return Some(CallTarget::Class(schema.clone()));
            }
        }
        // Delegate exactly once; the global bridge has no parent.
        self.global.as_ref().and_then(|g| g.resolve_named(name))
    }

    fn referenced_method_names(&self, instance: &Arc<Instance>) -> Value {
        let data = ClassAnalyzer::analyze(instance.class());
        let mut names = data.instance_method_names();
        names.extend(data.static_method_names());
        Value::Array(names.into_iter().map(Value::String).collect())
    }

    /// Sorted unique `target.method` entries resolvable through this
    /// bridge, merged once with the global bridge's listing.
    #[must_use]
    pub fn list_methods(&self) -> Vec<String> {
        let mut entries = BTreeSet::new();
        entries.insert(orb_protocol::SYSTEM_LIST_METHODS.to_owned());
        let (objects, classes) = {
            let tables = self.lock_tables();
            let objects: Vec<(String, Arc<ClassSchema>)> = tables
                .objects
                .iter()
                .filter_map(|(key, oi)| match key {
                    ObjectKey::Name(name) => Some((name.clone(), oi.interface.clone())),
                    ObjectKey::Handle(_) => None,
                })
                .collect();
            let classes: Vec<(String, Arc<ClassSchema>)> = tables
                .classes
                .iter()
                .map(|(name, schema)| (name.clone(), schema.clone()))
                .collect();
            (objects, classes)
        };
        for (name, interface) in objects {
            let data = ClassAnalyzer::analyze(&interface);
            for method in data.instance_method_names() {
                entries.insert(format!("{name}.{method}"));
            }
        }
        for (name, schema) in classes {
            let data = ClassAnalyzer::analyze(&schema);
            for method in data.static_method_names() {
                entries.insert(format!("{name}.{method}"));
            }
        }
        if let Some(global) = &self.global {
            entries.extend(global.list_methods());
        }
        entries.into_iter().collect()
    }

    fn is_local_param(&self, param: &TypeDesc, ctx_type: std::any::TypeId) -> bool {
        self.local_args.is_local(param, ctx_type)
            || self
                .global
                .as_ref()
                .is_some_and(|g| g.local_args.is_local(param, ctx_type))
    }

    fn resolve_local(
        &self,
        param: &TypeDesc,
        ctx: &CallContext,
    ) -> Option<Result<NativeValue, orb_core::HandlerError>> {
        self.local_args
            .resolve(param, ctx)
            .or_else(|| self.global.as_ref().and_then(|g| g.local_args.resolve(param, ctx)))
    }

    fn binder(self: &Arc<Self>) -> Arc<dyn ReferenceBinder> {
        self.clone()
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(target: "orb.bridge", "registration tables poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ReferenceBinder
// ---------------------------------------------------------------------------

impl ReferenceBinder for Bridge {
    fn reference_kind(&self, class: &str) -> Option<RefKind> {
        let tables = self.lock_tables();
        if tables.callable_reference_classes.contains(class) {
            Some(RefKind::Callable)
        } else if tables.reference_classes.contains(class) {
            Some(RefKind::Reference)
        } else {
            None
        }
    }

    fn bind_handle(&self, instance: &Arc<Instance>) -> i64 {
        let identity = Arc::as_ptr(instance) as usize;
        let mut tables = self.lock_tables();
        if let Some(handle) = tables.handle_by_identity.get(&identity) {
            return *handle;
        }
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        tables.handle_by_identity.insert(identity, handle);
        tables.reference_map.insert(handle, instance.clone());
        tables.objects.insert(
            ObjectKey::Handle(handle),
            ObjectInstance {
                instance: instance.clone(),
                interface: instance.class().clone(),
            },
        );
        handle
    }

    fn resolve_handle(&self, handle: i64) -> Option<Arc<Instance>> {
        self.lock_tables().reference_map.get(&handle).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
