use std::{
    any::TypeId,
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::{Rc, Weak},
    sync::Arc,
};

use crate::{
    Assembly, Config, Error, ErrorLog, Label, MonitorUnit, Monitored, Result, TypeEntry,
    ValueProcessorFactory,
    aot::{self, AotGenerator, AotReport},
    lifecycle::{LifecycleEvent, ObserverId, ObserverRegistry, UnitObserver},
    profiles::{MonitorProfile, ProfileCtorArgs, UnitTarget},
    type_name::TypeNameCache,
};

/// Summary of a profiling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfilingReport {
    pub assemblies_scanned: usize,
    pub types_profiled: usize,
    pub profiles_created: usize,
    pub static_units: usize,
    pub instance_units: usize,
    pub errors: usize,
}

/// Instance profiles of one monitored type.
struct TypeProfiles {
    instance: Vec<Rc<dyn MonitorProfile>>,
}

/// Units created for one registered instance.
struct InstanceGroup {
    key: usize,
    type_id: TypeId,
    alive: Box<dyn Fn() -> bool>,
    units: Vec<Rc<dyn MonitorUnit>>,
}

/// Instance registered before the first profiling pass.
struct PendingInstance {
    key: usize,
    attach: Box<dyn FnOnce(&mut MonitoringManager)>,
}

fn instance_key<T>(target: &Rc<RefCell<T>>) -> usize {
    Rc::as_ptr(target) as *const () as usize
}

/// Discovery and registration pipeline.
///
/// Owns every profile, unit and observer. Profiles are built once per
/// monitored member; static units are created during profiling and
/// instance units on [`register_instance`](Self::register_instance).
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
/// use lookout::{Assembly, Config, Members, MonitoringManager, Monitored, Reflect};
///
/// #[derive(Reflect)]
/// pub struct Player {
///     health: i32,
/// }
///
/// impl Monitored for Player {
///     fn describe(members: &mut Members<Self>) {
///         members.field("health", |p: &Player| &p.health);
///     }
/// }
///
/// let mut manager = MonitoringManager::new(Config::default());
/// manager.run_profiling(&[Assembly::new("game").register::<Player>()])?;
///
/// let player = Rc::new(RefCell::new(Player { health: 90 }));
/// manager.register_instance(&player)?;
/// manager.refresh_all();
/// assert_eq!(manager.units_for(&player)[0].cached_state(), "Health: 90");
/// # Ok::<(), lookout::Error>(())
/// ```
pub struct MonitoringManager {
    config: Config,
    factory: ValueProcessorFactory,
    errors: ErrorLog,
    type_names: Arc<TypeNameCache>,
    observers: ObserverRegistry,
    profiled: HashMap<TypeId, TypeProfiles>,
    excluded: HashSet<TypeId>,
    profiles: Vec<Rc<dyn MonitorProfile>>,
    static_units: Vec<Rc<dyn MonitorUnit>>,
    instances: Vec<InstanceGroup>,
    pending: Vec<PendingInstance>,
    profiling_completed: bool,
    shut_down: bool,
}

impl MonitoringManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factory: ValueProcessorFactory::new(),
            errors: ErrorLog::new(),
            type_names: Arc::new(TypeNameCache::new()),
            observers: ObserverRegistry::new(),
            profiled: HashMap::new(),
            excluded: HashSet::new(),
            profiles: Vec::new(),
            static_units: Vec::new(),
            instances: Vec::new(),
            pending: Vec::new(),
            profiling_completed: false,
            shut_down: false,
        }
    }

    fn ensure_running(&self) -> Result {
        if self.shut_down {
            tracing::debug!("monitoring manager is shut down, ignoring call");
            return Err(Error::ShutDown);
        }
        if !self.config.enable_monitoring {
            tracing::debug!("monitoring is disabled, ignoring call");
            return Err(Error::MonitoringDisabled);
        }
        Ok(())
    }

    /// Profile every monitored type of `assemblies` and create static units.
    ///
    /// Types already profiled are skipped, so the pass can run again with
    /// additional assemblies. Instances registered before the first pass
    /// are attached at its end, then observers receive
    /// `on_profiling_completed`.
    pub fn run_profiling(&mut self, assemblies: &[Assembly]) -> Result<ProfilingReport> {
        self.ensure_running()?;
        let errors_before = self.errors.len();
        let mut report = ProfilingReport::default();

        for assembly in assemblies {
            let excluded = self.config.is_assembly_excluded(assembly.name());
            if excluded || assembly.is_monitoring_disabled() {
                tracing::debug!(assembly = %assembly.label(), excluded, "assembly skipped");
                self.excluded
                    .extend(assembly.types().iter().map(TypeEntry::type_id));
                continue;
            }
            report.assemblies_scanned += 1;

            for entry in assembly.types() {
                if self.profiled.contains_key(&entry.type_id())
                    || self.excluded.contains(&entry.type_id())
                {
                    continue;
                }
                if entry.is_monitoring_disabled() {
                    tracing::debug!(type_name = %entry.info().path(), "type has monitoring disabled");
                    self.excluded.insert(entry.type_id());
                    continue;
                }
                let (profiles, statics) = self.profile_type(entry);
                report.types_profiled += 1;
                report.profiles_created += profiles;
                report.static_units += statics;
            }
        }

        if !self.profiling_completed {
            self.profiling_completed = true;
            for pending in std::mem::take(&mut self.pending) {
                (pending.attach)(self);
            }
            let instance_units = self.instance_units();
            report.instance_units = instance_units.len();
            self.observers.dispatch(LifecycleEvent::ProfilingCompleted {
                static_units: &self.static_units,
                instance_units: &instance_units,
            });
        }

        report.errors = self.errors.len() - errors_before;
        tracing::info!(
            types = report.types_profiled,
            profiles = report.profiles_created,
            static_units = report.static_units,
            errors = report.errors,
            "profiling completed"
        );
        Ok(report)
    }

    /// Build the profiles of one type. Returns the number of profiles and
    /// of static units created.
    fn profile_type(&mut self, entry: &TypeEntry) -> (usize, usize) {
        tracing::trace!(type_name = %entry.info().path(), "profiling type");
        let mut instance = Vec::new();
        let mut created = 0;
        let mut statics = 0;

        for member in entry.members() {
            if self.config.restrict_generic_types {
                let info = member.info();
                let blocked = std::iter::once(info.value_type())
                    .chain(info.parameters().iter().map(|p| p.type_info()))
                    .find(|ty| aot::check_type(ty).is_none());
                if let Some(ty) = blocked {
                    self.errors.record(Error::inaccessible(ty));
                    continue;
                }
            }

            let args = ProfileCtorArgs::new(&self.config, &self.factory);
            let profile = match member.into_profile(&args) {
                Ok(profile) => profile,
                Err(e) => {
                    self.errors.record(e);
                    continue;
                }
            };
            created += 1;
            self.profiles.push(profile.clone());

            if !profile.info().is_static() {
                instance.push(profile);
                continue;
            }
            match profile.create_unit(UnitTarget::Static) {
                Ok(unit) => {
                    self.observers.dispatch(LifecycleEvent::UnitCreated(&unit));
                    self.static_units.push(unit);
                    statics += 1;
                }
                Err(e) => {
                    self.errors.record(e);
                }
            }
        }

        self.profiled
            .insert(entry.type_id(), TypeProfiles { instance });
        (created, statics)
    }

    /// Create the instance units of `target`.
    ///
    /// Before the first profiling pass the instance is queued. Types that
    /// were not part of any scanned assembly are profiled on demand.
    /// Registering the same instance twice is ignored. Returns the number
    /// of units created.
    pub fn register_instance<T: Monitored>(&mut self, target: &Rc<RefCell<T>>) -> Result<usize> {
        self.ensure_running()?;
        if !self.profiling_completed {
            let key = instance_key(target);
            if self.pending.iter().any(|p| p.key == key) {
                return Ok(0);
            }
            let weak = Rc::downgrade(target);
            self.pending.push(PendingInstance {
                key,
                attach: Box::new(move |manager: &mut MonitoringManager| {
                    if let Some(target) = weak.upgrade() {
                        manager.attach_instance(&target);
                    }
                }),
            });
            return Ok(0);
        }
        Ok(self.attach_instance(target))
    }

    fn attach_instance<T: Monitored>(&mut self, target: &Rc<RefCell<T>>) -> usize {
        let type_id = TypeId::of::<T>();
        if self.excluded.contains(&type_id) || T::monitoring_disabled() {
            tracing::debug!(type_name = %T::type_info().path(), "instance of excluded type ignored");
            return 0;
        }
        if !self.profiled.contains_key(&type_id) {
            self.profile_type(&TypeEntry::of::<T>());
        }

        let key = instance_key(target);
        if let Some(index) = self.instances.iter().position(|g| g.key == key) {
            if (self.instances[index].alive)() {
                tracing::debug!(type_name = %T::type_info().path(), "instance already registered");
                return 0;
            }
            let stale = self.instances.swap_remove(index);
            self.dispose_group(stale);
        }

        let profiles = self
            .profiled
            .get(&type_id)
            .map(|p| p.instance.clone())
            .unwrap_or_default();
        let mut units = Vec::with_capacity(profiles.len());
        for profile in profiles {
            match profile.create_unit(UnitTarget::instance(target)) {
                Ok(unit) => {
                    self.observers.dispatch(LifecycleEvent::UnitCreated(&unit));
                    units.push(unit);
                }
                Err(e) => {
                    self.errors.record(e);
                }
            }
        }

        let created = units.len();
        let weak: Weak<RefCell<T>> = Rc::downgrade(target);
        self.instances.push(InstanceGroup {
            key,
            type_id,
            alive: Box::new(move || weak.strong_count() > 0),
            units,
        });
        created
    }

    /// Dispose the units of `target`. Returns the number of units disposed.
    pub fn unregister_instance<T: 'static>(&mut self, target: &Rc<RefCell<T>>) -> usize {
        let key = instance_key(target);
        self.pending.retain(|p| p.key != key);
        let Some(index) = self
            .instances
            .iter()
            .position(|g| g.key == key && g.type_id == TypeId::of::<T>())
        else {
            return 0;
        };
        let group = self.instances.swap_remove(index);
        self.dispose_group(group)
    }

    /// Dispose the units of instances whose target has been dropped.
    pub fn collect_dropped(&mut self) -> usize {
        let (dead, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut self.instances)
            .into_iter()
            .partition(|g| !(g.alive)());
        self.instances = alive;
        dead.into_iter().map(|g| self.dispose_group(g)).sum()
    }

    fn dispose_group(&mut self, group: InstanceGroup) -> usize {
        for unit in &group.units {
            unit.dispose();
            self.observers.dispatch(LifecycleEvent::UnitDisposed(unit));
        }
        group.units.len()
    }

    /// Refresh every live unit. Returns the number of units refreshed.
    ///
    /// Units of dropped targets are skipped until
    /// [`collect_dropped`](Self::collect_dropped) disposes them.
    pub fn refresh_all(&self) -> usize {
        let mut refreshed = 0;
        let groups = self
            .instances
            .iter()
            .filter(|g| (g.alive)())
            .flat_map(|g| g.units.iter());
        for unit in self.static_units.iter().chain(groups) {
            if !unit.is_disposed() {
                unit.refresh();
                refreshed += 1;
            }
        }
        refreshed
    }

    /// Dispose every unit and stop accepting registrations. Idempotent.
    pub fn shutdown(&mut self) -> usize {
        if self.shut_down {
            return 0;
        }
        self.shut_down = true;
        self.pending.clear();

        let mut disposed = 0;
        for unit in std::mem::take(&mut self.static_units) {
            unit.dispose();
            self.observers.dispatch(LifecycleEvent::UnitDisposed(&unit));
            disposed += 1;
        }
        for group in std::mem::take(&mut self.instances) {
            disposed += self.dispose_group(group);
        }
        tracing::info!(disposed, "monitoring shut down");
        disposed
    }

    /// Collect the AOT type definitions of `assemblies` and write the
    /// manifest to the configured path.
    pub fn generate_aot(&self, assemblies: &[Assembly]) -> Result<AotReport> {
        let mut generator = AotGenerator::with_cache(self.type_names.clone());
        generator.collect(assemblies, &self.config);
        generator.generate(&self.config)
    }

    pub fn add_observer<O: UnitObserver + 'static>(&mut self, observer: O) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn pause_observers(&mut self) {
        self.observers.pause();
    }

    pub fn resume_observers(&mut self) {
        self.observers.resume();
    }

    pub fn static_units(&self) -> &[Rc<dyn MonitorUnit>] {
        &self.static_units
    }

    pub fn instance_units(&self) -> Vec<Rc<dyn MonitorUnit>> {
        self.instances
            .iter()
            .flat_map(|g| g.units.iter().cloned())
            .collect()
    }

    pub fn units_for<T: 'static>(&self, target: &Rc<RefCell<T>>) -> Vec<Rc<dyn MonitorUnit>> {
        let key = instance_key(target);
        self.instances
            .iter()
            .find(|g| g.key == key && g.type_id == TypeId::of::<T>())
            .map(|g| g.units.clone())
            .unwrap_or_default()
    }

    pub fn profiles(&self) -> &[Rc<dyn MonitorProfile>] {
        &self.profiles
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn type_names(&self) -> &Arc<TypeNameCache> {
        &self.type_names
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn factory(&self) -> &ValueProcessorFactory {
        &self.factory
    }

    pub fn is_profiling_completed(&self) -> bool {
        self.profiling_completed
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl std::fmt::Debug for MonitoringManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringManager")
            .field("profiles", &self.profiles.len())
            .field("static_units", &self.static_units.len())
            .field("instances", &self.instances.len())
            .field("pending", &self.pending.len())
            .field("errors", &self.errors.len())
            .field("profiling_completed", &self.profiling_completed)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}
