use std::{any::Any, fmt, rc::Rc};

use crate::{
    Error, Fault, Inspect, MemberInfo, MonitorAttribute, MonitorUnit, OutParameterHandle, Result,
    ValueProcessor,
    profiles::{MonitorProfile, ProfileCtorArgs, ProfileInfo, UnitTarget, bind_target},
    reflect::ValueFactory,
    units::MethodUnit,
};

/// Invoker of a monitored method.
pub enum Invoker<T, R> {
    Instance(Rc<dyn Fn(&T, &mut Arguments) -> R>),
    Static(Rc<dyn Fn(&mut Arguments) -> R>),
}

/// Positional argument array passed to a method invoker.
///
/// Input slots hold the resolved argument values, `out` slots start at the
/// parameter type's default and are read back after the call.
pub struct Arguments {
    slots: Vec<Box<dyn Any>>,
}

impl Arguments {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The argument at `index`, if it holds a `P`.
    pub fn get<P: 'static>(&self, index: usize) -> Option<&P> {
        self.slots.get(index)?.downcast_ref()
    }

    pub fn get_mut<P: 'static>(&mut self, index: usize) -> Option<&mut P> {
        self.slots.get_mut(index)?.downcast_mut()
    }

    /// Store `value` into slot `index`. Returns `false` when the slot does
    /// not exist or holds another type.
    pub fn set<P: 'static>(&mut self, index: usize, value: P) -> bool {
        match self.get_mut::<P>(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn raw(&self, index: usize) -> Option<&dyn Any> {
        self.slots.get(index).map(|slot| slot.as_ref())
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.slots.len())
            .finish()
    }
}

/// Raw return value of one invocation paired with its rendering: the
/// processed return value followed by one line per `out` parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodResult<R> {
    value: R,
    rendered: String,
}

impl<R> MethodResult<R> {
    fn render(
        value: R,
        processor: &ValueProcessor<R>,
        outs: &[OutParameterHandle],
        arguments: &Arguments,
    ) -> Self {
        let mut rendered = processor(&value);
        for handle in outs {
            rendered.push('\n');
            handle.append_to(arguments.raw(handle.position()).unwrap_or(&()), &mut rendered);
        }
        Self { value, rendered }
    }

    pub fn value(&self) -> &R {
        &self.value
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn into_rendered(self) -> String {
        self.rendered
    }

    pub fn into_parts(self) -> (R, String) {
        (self.value, self.rendered)
    }
}

pub(crate) type MethodReader<T, R> =
    Rc<dyn Fn(Option<&T>, &mut Arguments) -> std::result::Result<MethodResult<R>, Fault>>;

/// Value source of every parameter, resolved once per profile.
struct ArgumentPlan {
    sources: Vec<ValueFactory>,
}

impl ArgumentPlan {
    /// Declared arguments align with the parameters by position. An entry
    /// at an out position is ignored. A missing or `None` entry falls
    /// through to the parameter default, then to the type's default value.
    fn resolve(member: &MemberInfo, attribute: &MonitorAttribute) -> Result<Self> {
        let parameters = member.parameters().len();
        if attribute.args.len() > parameters {
            return Err(Error::ArgumentCount {
                kind: member.kind(),
                member: member.name().to_owned(),
                declared: attribute.args.len(),
                expected: parameters,
            });
        }

        let mut sources = Vec::with_capacity(parameters);
        for param in member.parameters() {
            let zero = param.zero_factory();
            let declared = if param.is_out() {
                None
            } else {
                attribute.args.get(param.position()).cloned().flatten()
            };
            let source: ValueFactory = match declared {
                Some(value) => {
                    if param.convert(&value).is_none() {
                        return Err(Error::ArgumentConversion {
                            member: member.name().to_owned(),
                            index: param.position(),
                            expected: param.type_info().syntax_name(),
                        });
                    }
                    let param = param.clone();
                    Rc::new(move || param.convert(&value).unwrap_or_else(zero))
                }
                None => param
                    .default_factory()
                    .unwrap_or_else(|| Rc::new(move || zero())),
            };
            sources.push(source);
        }
        Ok(Self { sources })
    }

    fn instantiate(&self) -> Arguments {
        Arguments {
            slots: self.sources.iter().map(|source| source()).collect(),
        }
    }

    fn reset(&self, arguments: &mut Arguments) {
        arguments.slots.clear();
        arguments
            .slots
            .extend(self.sources.iter().map(|source| source()));
    }
}

/// Profile of a monitored method, invoked on every refresh.
pub struct MethodProfile<T, R> {
    info: Rc<ProfileInfo>,
    plan: Rc<ArgumentPlan>,
    read: MethodReader<T, R>,
    outs: Vec<OutParameterHandle>,
}

impl<T: 'static, R: Inspect> MethodProfile<T, R> {
    pub fn new(
        member: &MemberInfo,
        attribute: &MonitorAttribute,
        invoker: Invoker<T, R>,
        args: &ProfileCtorArgs<'_>,
    ) -> Result<Self> {
        let plan = Rc::new(ArgumentPlan::resolve(member, attribute)?);
        let info = Rc::new(ProfileInfo::new::<T>(member, attribute, args.config));
        let format = info.format();
        let processor = args.factory.create_processor_for_type::<R>(format);
        let outs: Vec<OutParameterHandle> = member
            .parameters()
            .iter()
            .filter_map(|param| param.out_handle(format, args.factory))
            .collect();

        let reset = plan.clone();
        let handles = outs.clone();
        let read: MethodReader<T, R> = match invoker {
            Invoker::Instance(call) => Rc::new(move |target: Option<&T>, arguments: &mut Arguments| {
                let target = target.ok_or(Fault::MissingTarget)?;
                reset.reset(arguments);
                let value = call(target, arguments);
                Ok(MethodResult::render(value, &processor, &handles, arguments))
            }),
            Invoker::Static(call) => Rc::new(move |_: Option<&T>, arguments: &mut Arguments| {
                reset.reset(arguments);
                let value = call(arguments);
                Ok(MethodResult::render(value, &processor, &handles, arguments))
            }),
        };

        Ok(Self {
            info,
            plan,
            read,
            outs,
        })
    }

    pub fn out_parameters(&self) -> &[OutParameterHandle] {
        &self.outs
    }
}

impl<T: 'static, R: Inspect> MonitorProfile for MethodProfile<T, R> {
    fn info(&self) -> &Rc<ProfileInfo> {
        &self.info
    }

    fn create_unit(&self, target: UnitTarget<'_>) -> Result<Rc<dyn MonitorUnit>> {
        let binding = bind_target::<T>(&self.info, target)?;
        Ok(Rc::new(MethodUnit::<T, R>::new(
            self.info.clone(),
            binding,
            self.read.clone(),
            self.plan.instantiate(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::{Config, Members, Reflect, TypeInfo, UnitStatus, ValueProcessorFactory};

    #[derive(Default)]
    struct Worker {
        calls: Cell<i32>,
    }

    impl Reflect for Worker {
        fn type_info() -> TypeInfo {
            TypeInfo::reference("Worker", "tests::Worker")
        }
    }

    fn build(members: Members<Worker>) -> Result<Rc<dyn MonitorProfile>> {
        let config = Config::default();
        let factory = ValueProcessorFactory::new();
        let entry = members.into_entries().remove(0);
        entry.into_profile(&ProfileCtorArgs::new(&config, &factory))
    }

    #[test]
    fn void_method_renders_label_then_out_lines() {
        let mut members = Members::<Worker>::new();
        members
            .method("do_work", |w: &Worker, args: &mut Arguments| {
                w.calls.set(w.calls.get() + 1);
                args.set(0, 42_i32);
            })
            .out::<i32>("code");
        let profile = build(members).expect("profile");

        let worker = Rc::new(RefCell::new(Worker::default()));
        let unit = profile.create_unit(UnitTarget::instance(&worker)).expect("unit");
        unit.refresh();
        assert_eq!(unit.cached_state(), "Do Work\n    out code: 42");
        assert_eq!(unit.cached_state().lines().count(), 2);
        assert_eq!(worker.borrow().calls.get(), 1);
    }

    #[test]
    fn arguments_follow_declared_then_default_then_zero() {
        let mut members = Members::<Worker>::new();
        members
            .method("sum", |_: &Worker, args: &mut Arguments| {
                let a = args.get::<i32>(0).copied().unwrap_or(-1);
                let b = args.get::<i32>(1).copied().unwrap_or(-1);
                let c = args.get::<i32>(2).copied().unwrap_or(-1);
                format!("{a}/{b}/{c}")
            })
            .param::<i32>("a")
            .param_default::<i32>("b", 7)
            .param_default::<i32>("c", 9)
            .skip_arg()
            .skip_arg()
            .arg(3);
        let profile = build(members).expect("profile");
        let worker = Rc::new(RefCell::new(Worker::default()));
        let unit = profile.create_unit(UnitTarget::instance(&worker)).expect("unit");
        assert_eq!(unit.get_state(), "Sum: 0/7/3");
    }

    #[test]
    fn declared_arguments_align_by_parameter_position() {
        let mut members = Members::<Worker>::new();
        members
            .method("scan", |_: &Worker, args: &mut Arguments| {
                let depth = args.get::<i32>(1).copied().unwrap_or(-1);
                args.set(0, depth > 0);
                depth
            })
            .out::<bool>("found")
            .param::<i32>("depth")
            .arg(7);
        let profile = build(members).expect("profile");
        let worker = Rc::new(RefCell::new(Worker::default()));
        let unit = profile.create_unit(UnitTarget::instance(&worker)).expect("unit");
        assert_eq!(unit.get_state(), "Scan: 0\n    out found: false");

        let mut members = Members::<Worker>::new();
        members
            .method("scan", |_: &Worker, args: &mut Arguments| {
                args.get::<i32>(1).copied().unwrap_or(-1)
            })
            .out::<bool>("found")
            .param::<i32>("depth")
            .skip_arg()
            .arg(7);
        let profile = build(members).expect("profile");
        let unit = profile.create_unit(UnitTarget::instance(&worker)).expect("unit");
        assert_eq!(unit.get_state(), "Scan: 7\n    out found: false");
    }

    #[test]
    fn rejects_excess_and_unconvertible_arguments() {
        let mut members = Members::<Worker>::new();
        members
            .method("one", |_: &Worker, _: &mut Arguments| 1)
            .param::<i32>("a")
            .arg(1)
            .arg(2);
        assert!(matches!(
            build(members),
            Err(Error::ArgumentCount {
                declared: 2,
                expected: 1,
                ..
            })
        ));

        let mut members = Members::<Worker>::new();
        members
            .method("flag", |_: &Worker, _: &mut Arguments| true)
            .param::<bool>("on")
            .arg("maybe");
        assert!(matches!(
            build(members),
            Err(Error::ArgumentConversion { index: 0, .. })
        ));
    }

    #[test]
    fn panicking_method_faults_and_keeps_last_state() {
        let mut members = Members::<Worker>::new();
        members.method("risky", |w: &Worker, _: &mut Arguments| {
            w.calls.set(w.calls.get() + 1);
            if w.calls.get() > 1 {
                panic!("second call fails");
            }
            w.calls.get()
        });
        let profile = build(members).expect("profile");
        let worker = Rc::new(RefCell::new(Worker::default()));
        let unit = profile.create_unit(UnitTarget::instance(&worker)).expect("unit");

        unit.refresh();
        assert_eq!(unit.cached_state(), "Risky: 1");
        unit.refresh();
        assert_eq!(unit.status(), UnitStatus::Faulted);
        assert_eq!(unit.cached_state(), "Risky: 1");
        assert_eq!(unit.fault(), Some(Fault::Panicked("second call fails".into())));
    }

    #[test]
    fn static_profile_rejects_nothing_and_instance_profile_needs_target() {
        let mut members = Members::<Worker>::new();
        members.method("ping", |_: &Worker, _: &mut Arguments| 0_u8);
        let profile = build(members).expect("profile");
        assert!(matches!(
            profile.create_unit(UnitTarget::Static),
            Err(Error::TargetTypeMismatch { .. })
        ));

        let mut members = Members::<Worker>::new();
        members.static_method("uptime", |_: &mut Arguments| 5_u64);
        let profile = build(members).expect("profile");
        let unit = profile.create_unit(UnitTarget::Static).expect("unit");
        assert_eq!(unit.get_state(), "Uptime: 5");
    }
}
