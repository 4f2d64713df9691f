//! Compiled transforms and their cache.
//!
//! A [`CompiledTransform`] is a small program synthesized from logic found in
//! the platform's player program. It maps one string to another: a scrambled
//! signature to its descrambled form, or an `n` parameter to its accepted
//! form.
//!
//! # Isolation
//!
//! The synthesized program comes from untrusted text, so every evaluation
//! runs in a fresh QuickJS runtime:
//! * only the scalar input is bound, under a fixed global name
//! * only a string result is accepted
//! * memory, stack and wall-clock time are bounded
//! * QuickJS has no file system, network or host modules unless they are
//!   registered, and none are
//!
//! Nothing survives between evaluations, so a transform is pure and
//! reentrant: the same input always yields the same output, and it can be
//! shared between tasks and threads.
//!
//! # Caching
//!
//! A [`TransformCache`] is owned by a client. It is populated once from one
//! player program and then reused; population is guarded so that concurrent
//! first use extracts only once.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
    time::{Duration, Instant},
};

use rquickjs::{Context, Ctx, Runtime};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// The transforms that stream resolution needs.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TransformKind {
    /// Descrambles stream signatures.
    Decipher,
    /// Rewrites the `n` anti-abuse parameter.
    NParam,
}

impl TransformKind {
    /// Global name under which the input is bound during evaluation.
    #[must_use]
    pub fn binding(self) -> &'static str {
        match self {
            Self::Decipher => "signature",
            Self::NParam => "n",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decipher => write!(f, "decipher"),
            Self::NParam => write!(f, "`n` parameter"),
        }
    }
}

/// Resource budget for a single evaluation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Limits {
    pub timeout: Duration,
    pub memory: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            memory: 32 * 1024 * 1024,
        }
    }
}

/// A transform ready to be applied to strings.
#[derive(Clone)]
pub struct CompiledTransform {
    kind: TransformKind,
    source: String,
    limits: Limits,
}

impl CompiledTransform {
    /// Maximum stack size of the sandbox. Deeply nested input fails instead
    /// of overflowing the host stack.
    const STACK_SIZE: usize = 1024 * 1024;

    /// Compiles a transform from its definitions and the name of the function
    /// that takes the input.
    ///
    /// `prelude` must only define things; it is evaluated once here to
    /// reject programs that do not even parse.
    ///
    /// # Errors
    ///
    /// Returns an evaluation error if the definitions do not evaluate.
    pub fn compile(
        kind: TransformKind,
        prelude: &str,
        entry: &str,
        limits: Limits,
    ) -> Result<Self> {
        let (_runtime, context) = Self::sandbox(limits)?;
        context.with(|ctx| {
            ctx.eval::<(), _>(prelude)
                .map_err(|e| describe(&ctx, e, kind, "compilation"))
        })?;

        let source = format!("{prelude}{entry}({});", kind.binding());
        trace!("{kind} transform: {source}");

        Ok(Self {
            kind,
            source,
            limits,
        })
    }

    #[must_use]
    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    /// The synthesized program, including the invocation.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Runs the transform on `input`.
    ///
    /// # Errors
    ///
    /// Returns an evaluation error if the program throws, exceeds its
    /// budget, or produces something other than a string.
    pub fn apply(&self, input: &str) -> Result<String> {
        let (_runtime, context) = Self::sandbox(self.limits)?;
        context.with(|ctx| {
            ctx.globals()
                .set(self.kind.binding(), input)
                .map_err(|e| describe(&ctx, e, self.kind, "binding"))?;

            let value = ctx
                .eval::<rquickjs::Value, _>(self.source.as_str())
                .map_err(|e| describe(&ctx, e, self.kind, "evaluation"))?;

            match value.as_string() {
                Some(output) => output.to_string().map_err(Into::into),
                None => Err(Error::evaluation(format!(
                    "{} transform returned {} instead of a string",
                    self.kind,
                    value.type_name()
                ))),
            }
        })
    }

    /// Creates a fresh runtime and context with the given budget.
    fn sandbox(limits: Limits) -> Result<(Runtime, Context)> {
        let runtime = Runtime::new()?;
        runtime.set_memory_limit(limits.memory);
        runtime.set_max_stack_size(Self::STACK_SIZE);

        let deadline = Instant::now() + limits.timeout;
        runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));

        let context = Context::full(&runtime)?;
        Ok((runtime, context))
    }
}

impl fmt::Debug for CompiledTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTransform")
            .field("kind", &self.kind)
            .field("source_len", &self.source.len())
            .field("limits", &self.limits)
            .finish()
    }
}

/// Turns a sandbox error into an evaluation error, fetching the pending
/// exception message when there is one.
fn describe(ctx: &Ctx<'_>, e: rquickjs::Error, kind: TransformKind, stage: &str) -> Error {
    if !matches!(e, rquickjs::Error::Exception) {
        return Error::evaluation(format!("{kind} {stage} failed: {e}"));
    }

    let caught = ctx.catch();
    let message = caught
        .as_exception()
        .and_then(rquickjs::Exception::message)
        .unwrap_or_else(|| format!("{caught:?}"));

    Error::evaluation(format!("{kind} {stage} failed: {message}"))
}

/// Both transforms, as handed out by the cache.
#[derive(Clone, Debug)]
pub struct Transforms {
    pub decipher: Arc<CompiledTransform>,
    pub n_param: Arc<CompiledTransform>,
}

/// Transforms extracted from one player program.
#[derive(Debug)]
pub struct Extracted {
    /// URL of the player program the transforms came from.
    pub player: String,
    pub decipher: CompiledTransform,
    pub n_param: CompiledTransform,
}

/// Maps transform kinds to compiled transforms.
///
/// There is no eviction and no expiry: once populated, entries are reused
/// until [`TransformCache::clear`] is called or the cache is dropped.
#[derive(Default)]
pub struct TransformCache {
    entries: RwLock<HashMap<TransformKind, Arc<CompiledTransform>>>,

    /// Player program the entries were extracted from.
    player: RwLock<Option<String>>,

    /// Held while populating, so that only one task extracts.
    populating: Mutex<()>,
}

impl TransformCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, kind: TransformKind) -> Option<Arc<CompiledTransform>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    #[must_use]
    pub fn has(&self, kind: TransformKind) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    pub fn set(&self, kind: TransformKind, transform: CompiledTransform) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, Arc::new(transform));
    }

    /// Forgets all transforms and the player they came from.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.player.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// URL of the player program the cached transforms were extracted from.
    #[must_use]
    pub fn player(&self) -> Option<String> {
        self.player
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Both transforms, if present and, when `player` is given, extracted
    /// from that player program.
    fn lookup(&self, player: Option<&str>) -> Option<Transforms> {
        if let Some(wanted) = player {
            if self.player().as_deref() != Some(wanted) {
                return None;
            }
        }

        Some(Transforms {
            decipher: self.get(TransformKind::Decipher)?,
            n_param: self.get(TransformKind::NParam)?,
        })
    }

    /// Returns both transforms, populating the cache first if needed.
    ///
    /// With `player` set to `None`, any cached transforms are good enough.
    /// With `player` set, cached transforms are only reused when they were
    /// extracted from that player program.
    ///
    /// Concurrent callers wait for a single `populate` to finish.
    ///
    /// # Errors
    ///
    /// Returns whatever error `populate` returns; the cache is unchanged
    /// in that case.
    pub async fn get_or_populate<F, Fut>(
        &self,
        player: Option<&str>,
        populate: F,
    ) -> Result<Transforms>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Extracted>>,
    {
        if let Some(transforms) = self.lookup(player) {
            return Ok(transforms);
        }

        let _guard = self.populating.lock().await;

        // Check again: another task may have populated meanwhile.
        if let Some(transforms) = self.lookup(player) {
            return Ok(transforms);
        }

        let extracted = populate().await?;
        info!("extracted transforms from {}", extracted.player);

        self.set(TransformKind::Decipher, extracted.decipher);
        self.set(TransformKind::NParam, extracted.n_param);
        *self.player.write().unwrap_or_else(PoisonError::into_inner) = Some(extracted.player);

        self.lookup(None)
            .ok_or_else(|| Error::internal("transform cache lost its entries"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ErrorKind;

    const REVERSE: &str = r#"const m = { r(a) { a.reverse() } };
        const decipher = (a) => { a = a.split(""); m.r(a); return a.join("") };"#;

    fn reverse() -> CompiledTransform {
        CompiledTransform::compile(TransformKind::Decipher, REVERSE, "decipher", Limits::default())
            .unwrap()
    }

    #[test]
    fn applies_program_to_input() {
        assert_eq!(reverse().apply("abc").unwrap(), "cba");
        assert!(reverse().source().ends_with("decipher(signature);"));
    }

    #[test]
    fn is_pure_across_calls() {
        let transform = reverse();
        let first = transform.apply("0123456789").unwrap();
        let second = transform.apply("0123456789").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn does_not_leak_state_between_calls() {
        let transform = CompiledTransform::compile(
            TransformKind::NParam,
            "var counter = (globalThis.counter || 0) + 1; const f = (a) => a + counter;",
            "f",
            Limits::default(),
        )
        .unwrap();

        assert_eq!(transform.apply("x").unwrap(), "x1");
        assert_eq!(transform.apply("x").unwrap(), "x1");
    }

    #[test]
    fn has_no_host_capabilities() {
        let transform = CompiledTransform::compile(
            TransformKind::NParam,
            "const f = () => [typeof require, typeof fetch, typeof std, typeof os].join();",
            "f",
            Limits::default(),
        )
        .unwrap();

        assert_eq!(
            transform.apply("").unwrap(),
            "undefined,undefined,undefined,undefined"
        );
    }

    #[test]
    fn rejects_unparsable_programs() {
        let err = CompiledTransform::compile(
            TransformKind::Decipher,
            "const decipher = (a) => {",
            "decipher",
            Limits::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Evaluation);
    }

    #[test]
    fn reports_thrown_errors() {
        let transform = CompiledTransform::compile(
            TransformKind::NParam,
            r#"const f = () => { throw new Error("boom") };"#,
            "f",
            Limits::default(),
        )
        .unwrap();

        let err = transform.apply("x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Evaluation);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn rejects_non_string_results() {
        let transform = CompiledTransform::compile(
            TransformKind::NParam,
            "const f = (a) => a.length;",
            "f",
            Limits::default(),
        )
        .unwrap();

        assert_eq!(transform.apply("abc").unwrap_err().kind, ErrorKind::Evaluation);
    }

    #[test]
    fn stops_runaway_programs() {
        let limits = Limits {
            timeout: Duration::from_millis(100),
            ..Limits::default()
        };
        let transform =
            CompiledTransform::compile(TransformKind::NParam, "const f = () => { for (;;) {} };", "f", limits)
                .unwrap();

        assert_eq!(transform.apply("x").unwrap_err().kind, ErrorKind::Evaluation);
    }

    #[test]
    fn cache_get_has_set_clear() {
        let cache = TransformCache::new();
        assert!(!cache.has(TransformKind::Decipher));
        assert!(cache.get(TransformKind::Decipher).is_none());

        cache.set(TransformKind::Decipher, reverse());
        assert!(cache.has(TransformKind::Decipher));
        assert!(!cache.has(TransformKind::NParam));

        cache.clear();
        assert!(!cache.has(TransformKind::Decipher));
        assert!(cache.player().is_none());
    }

    fn extracted(player: &str) -> Extracted {
        Extracted {
            player: player.to_owned(),
            decipher: reverse(),
            n_param: reverse(),
        }
    }

    #[tokio::test]
    async fn populates_once_under_concurrency() {
        let cache = TransformCache::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let populate = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(extracted("/s/player/one/base.js"))
        };

        let (first, second) = tokio::join!(
            cache.get_or_populate(None, populate),
            cache.get_or_populate(None, populate),
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.player().as_deref(), Some("/s/player/one/base.js"));
    }

    #[tokio::test]
    async fn reuses_transforms_unless_player_is_required() {
        let cache = TransformCache::new();
        let calls = AtomicUsize::new(0);

        let populate = |player: &'static str| {
            let calls = &calls;
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(extracted(player))
            }
        };

        cache.get_or_populate(None, populate("one")).await.unwrap();
        cache.get_or_populate(None, populate("two")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.player().as_deref(), Some("one"));

        cache.get_or_populate(Some("one"), populate("one")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.get_or_populate(Some("two"), populate("two")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.player().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn failed_population_leaves_cache_empty() {
        let cache = TransformCache::new();
        let result = cache
            .get_or_populate(None, || async {
                Err(Error::extraction("decipher function name not found"))
            })
            .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::Extraction);
        assert!(!cache.has(TransformKind::Decipher));
        assert!(!cache.has(TransformKind::NParam));
    }
}
