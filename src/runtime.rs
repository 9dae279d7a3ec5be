pub mod array;
mod cache;
pub mod coercion;
mod config;
mod error;
pub mod exception;
mod well_known;

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::host::{FieldId, HostRuntime, MethodId, Ref};

pub use array::ArrayWord;
pub use cache::*;
pub use config::*;
pub use error::*;
pub use well_known::*;

use exception::{
    ARITHMETIC_EXCEPTION, NEGATIVE_ARRAY_SIZE_EXCEPTION, NULL_POINTER_EXCEPTION,
};

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Builds the process-wide [`Runtime`]. Must run once, before any natively
/// compiled method is registered with the host.
pub fn init_runtime(
    host: Arc<dyn HostRuntime>,
    config: RuntimeConfig,
) -> Result<&'static Runtime, InitError> {
    let mut created = false;
    let runtime = RUNTIME.get_or_try_init(|| {
        created = true;
        Runtime::new(host, config)
    })?;
    if !created {
        return Err(InitError::AlreadyInitialized);
    }
    log::debug!(
        "runtime initialized with reference budget {}",
        config.reference_budget
    );
    Ok(runtime)
}

/// The process-wide runtime, once [`init_runtime`] has run.
pub fn runtime() -> Option<&'static Runtime> {
    RUNTIME.get()
}

/// Symbol resolution and exception plumbing for native method bodies bound
/// to one host.
///
/// Every operation returning [`UnwindResult`] leaves a guest exception
/// pending on the calling thread when it fails; the caller stops and unwinds
/// to its handler.
pub struct Runtime {
    host: Arc<dyn HostRuntime>,
    config: RuntimeConfig,
    well_known: WellKnownSymbols,
    symbols: SymbolCache,
}

impl Runtime {
    pub fn new(host: Arc<dyn HostRuntime>, config: RuntimeConfig) -> Result<Self, InitError> {
        let well_known = WellKnownSymbols::init(host.as_ref())?;
        let symbols = SymbolCache::new(&well_known, config.reference_budget);
        Ok(Self {
            host,
            config,
            well_known,
            symbols,
        })
    }

    pub fn host(&self) -> &dyn HostRuntime {
        self.host.as_ref()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn well_known(&self) -> &WellKnownSymbols {
        &self.well_known
    }

    pub fn symbols(&self) -> &SymbolCache {
        &self.symbols
    }

    /// A transient result must be handed to [`release`](Runtime::release)
    /// before the native method returns.
    pub fn resolve_class(&self, slot: &ClassSlot, name: &str) -> UnwindResult<ClassHandle> {
        let resolved = self.symbols.resolve_class(self.host(), slot, name);
        self.raise_on_failure(resolved)
    }

    pub fn release(&self, class: ClassHandle) {
        if let ClassHandle::Transient(reference) = class {
            self.host.release_transient(reference);
        }
    }

    pub fn resolve_method(
        &self,
        site: &MethodSite,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> UnwindResult<MethodId> {
        self.resolve_member(site, owner, name, signature, false)
    }

    pub fn resolve_static_method(
        &self,
        site: &MethodSite,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> UnwindResult<MethodId> {
        self.resolve_member(site, owner, name, signature, true)
    }

    pub fn resolve_field(
        &self,
        site: &FieldSite,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> UnwindResult<FieldId> {
        self.resolve_member(site, owner, name, signature, false)
    }

    pub fn resolve_static_field(
        &self,
        site: &FieldSite,
        owner: &str,
        name: &str,
        signature: &str,
    ) -> UnwindResult<FieldId> {
        self.resolve_member(site, owner, name, signature, true)
    }

    fn resolve_member<M: Member>(
        &self,
        site: &MemberSite<M>,
        owner: &str,
        name: &str,
        signature: &str,
        is_static: bool,
    ) -> UnwindResult<M> {
        let resolved =
            self.symbols
                .resolve_member(self.host(), site, owner, name, signature, is_static);
        self.raise_on_failure(resolved)
    }

    // the host may already have raised the matching error during its lookup
    fn raise_on_failure<T>(&self, resolved: Result<T, ResolutionError>) -> UnwindResult<T> {
        resolved.map_err(|err| {
            log::debug!("{err}");
            if !self.host.exception_pending() {
                self.raise(err.guest_exception_class(), err.guest_message());
            }
            Unwind::Resolution(err)
        })
    }

    pub fn raise(&self, class_name: &str, message: &str) {
        exception::raise(self.host(), class_name, message);
    }

    /// `checkcast`: null passes.
    pub fn check_cast(
        &self,
        instance: Option<Ref>,
        target: Ref,
        target_name: &str,
    ) -> UnwindResult<()> {
        if exception::check_cast(self.host(), instance, target, target_name) {
            return Err(CastError {
                target: target_name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn is_instance_of(&self, instance: Option<Ref>, class: Ref) -> bool {
        exception::is_instance_of(self.host(), instance, class)
    }

    pub fn is_instance_of_name(&self, instance: Option<Ref>, class_name: &str) -> bool {
        exception::is_instance_of_name(self.host(), instance, class_name)
    }

    pub fn is_same_object(&self, a: Option<Ref>, b: Option<Ref>) -> bool {
        exception::is_same_object(self.host(), a, b)
    }

    pub fn not_null(&self, value: Option<Ref>) -> UnwindResult<Ref> {
        value.ok_or_else(|| {
            self.raise(NULL_POINTER_EXCEPTION, "NullPointerException");
            Unwind::Pending
        })
    }

    /// Unwinds if a host call left an exception pending.
    pub fn check_pending(&self) -> UnwindResult<()> {
        if self.host.exception_pending() {
            Err(Unwind::Pending)
        } else {
            Ok(())
        }
    }

    /// Landing pad entry: fetches and clears the pending exception.
    pub fn take_pending(&self) -> Option<Ref> {
        self.host.take_exception()
    }

    /// Makes `exception` pending again, for handlers that do not match.
    pub fn rethrow(&self, exception: Ref) -> Unwind {
        self.host.throw(exception);
        Unwind::Pending
    }

    pub fn check_array_size(&self, length: i32) -> UnwindResult<usize> {
        usize::try_from(length).map_err(|_| {
            self.raise(NEGATIVE_ARRAY_SIZE_EXCEPTION, "negative array size");
            Unwind::Pending
        })
    }

    /// Integral division and remainder only; floating point division by zero
    /// is well defined.
    pub fn check_divisor(&self, divisor: impl Into<i64>) -> UnwindResult<()> {
        if divisor.into() == 0 {
            self.raise(ARITHMETIC_EXCEPTION, "divide by zero");
            return Err(Unwind::Pending);
        }
        Ok(())
    }

    pub fn fill(&self, array: Ref, element_type: &str, values: &[ArrayWord]) {
        array::fill(self.host(), array, element_type, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{ClassDef, MemoryHost};

    fn setup() -> (Arc<MemoryHost>, Runtime) {
        let host = Arc::new(MemoryHost::new());
        host.define_class(ClassDef::new("demo/Counter").method("next", "()I"))
            .unwrap();
        let runtime = Runtime::new(host.clone(), RuntimeConfig::default()).unwrap();
        (host, runtime)
    }

    #[test]
    fn test_resolution_failure_raises_once() {
        let (host, runtime) = setup();
        let site = MethodSite::new();
        let err = runtime
            .resolve_method(&site, "demo/Counter", "reset", "()V")
            .unwrap_err();
        assert!(matches!(
            err,
            Unwind::Resolution(ResolutionError::MethodNotFound { .. })
        ));
        let pending = host.take_exception().unwrap();
        assert_eq!(
            host.describe_exception(pending).unwrap().class_name.as_ref(),
            "java/lang/NoSuchMethodError"
        );
        assert!(!host.exception_pending());
    }

    #[test]
    fn test_resolution_failure_raises_when_host_is_silent() {
        let (host, runtime) = setup();
        host.set_lookup_failures_throw(false);
        let err = runtime
            .resolve_class(&ClassSlot::new(), "demo/Gone")
            .unwrap_err();
        assert_eq!(
            err,
            Unwind::Resolution(ResolutionError::ClassNotFound("demo/Gone".to_string()))
        );
        let pending = host.pending_exception().unwrap();
        assert_eq!(pending.class_name.as_ref(), "java/lang/NoClassDefFoundError");
        assert_eq!(pending.message.as_deref(), Some("demo/Gone"));
    }

    #[test]
    fn test_static_and_instance_members() {
        let (host, runtime) = setup();
        assert!(
            runtime
                .resolve_static_method(&MethodSite::new(), "demo/Counter", "next", "()I")
                .is_err()
        );
        assert!(runtime.take_pending().is_some());
        let next = runtime
            .resolve_method(&MethodSite::new(), "demo/Counter", "next", "()I")
            .unwrap();

        // members are keyed without their static flag, a table hit answers both
        let lookups = host.method_lookup_count();
        assert_eq!(
            runtime.resolve_static_method(&MethodSite::new(), "demo/Counter", "next", "()I"),
            Ok(next)
        );
        assert_eq!(host.method_lookup_count(), lookups);

        let field = runtime.resolve_static_field(
            &FieldSite::new(),
            "java/lang/Integer",
            "TYPE",
            "Ljava/lang/Class;",
        );
        assert!(field.is_ok());
        assert_eq!(runtime.check_pending(), Ok(()));
    }

    #[test]
    fn test_check_cast() {
        let (host, runtime) = setup();
        let counter = runtime
            .resolve_class(&ClassSlot::new(), "demo/Counter")
            .unwrap()
            .get();
        let string = runtime
            .resolve_class(&ClassSlot::new(), "java/lang/String")
            .unwrap()
            .get();
        let value = host.new_object(counter).unwrap();
        assert_eq!(runtime.check_cast(Some(value), counter, "demo/Counter"), Ok(()));
        assert_eq!(runtime.check_cast(None, string, "java/lang/String"), Ok(()));
        assert_eq!(
            runtime.check_cast(Some(value), string, "java/lang/String"),
            Err(Unwind::Cast(CastError {
                target: "java/lang/String".to_string()
            }))
        );
        assert_eq!(runtime.check_pending(), Err(Unwind::Pending));
    }

    #[test]
    fn test_guards() {
        let (host, runtime) = setup();
        assert_eq!(runtime.check_array_size(3), Ok(3));
        assert_eq!(runtime.check_divisor(7), Ok(()));
        assert_eq!(runtime.check_pending(), Ok(()));

        assert_eq!(runtime.check_array_size(-1), Err(Unwind::Pending));
        let pending = host.pending_exception().unwrap();
        assert_eq!(pending.class_name.as_ref(), NEGATIVE_ARRAY_SIZE_EXCEPTION);
        assert_eq!(pending.message.as_deref(), Some("negative array size"));
        host.clear_exception();

        assert_eq!(runtime.check_divisor(0i64), Err(Unwind::Pending));
        assert_eq!(
            host.pending_exception().unwrap().message.as_deref(),
            Some("divide by zero")
        );
        host.clear_exception();

        assert_eq!(runtime.not_null(None), Err(Unwind::Pending));
        assert_eq!(
            host.pending_exception().unwrap().class_name.as_ref(),
            NULL_POINTER_EXCEPTION
        );
    }

    #[test]
    fn test_rethrow() {
        let (host, runtime) = setup();
        runtime.raise(ARITHMETIC_EXCEPTION, "boom");
        let exception = runtime.take_pending().unwrap();
        assert!(!host.exception_pending());
        assert!(!runtime.is_instance_of_name(Some(exception), "java/lang/Error"));
        assert!(runtime.is_instance_of_name(Some(exception), "java/lang/RuntimeException"));
        assert_eq!(runtime.rethrow(exception), Unwind::Pending);
        assert!(host.exception_pending());
    }
}
