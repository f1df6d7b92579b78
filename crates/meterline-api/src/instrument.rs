//! Typed instrument handles.
//!
//! A handle wraps whatever core the meter handed out at creation time. The
//! core is fixed for the handle's lifetime: a handle created from an
//! unbound meter stays a no-op even after the meter gets bound.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::descriptor::Descriptor;
use crate::labels::LabelSet;
use crate::noop::NoopInstrument;
use crate::number::Numeric;

/// Implementation side of an instrument: where recordings go.
///
/// Implementations must never panic on a recording; invalid values are
/// dropped.
pub trait InstrumentCore<T: Numeric>: Send + Sync {
    /// Descriptor of the backing instrument, `None` for no-op cores
    fn descriptor(&self) -> Option<&Descriptor>;

    /// Record one value
    fn record(&self, value: T, labels: &LabelSet);
}

macro_rules! sync_instrument {
    ($(#[$meta:meta])* $name:ident, $bound:ident, $method:ident) => {
        $(#[$meta])*
        pub struct $name<T: Numeric> {
            core: Arc<dyn InstrumentCore<T>>,
        }

        impl<T: Numeric> $name<T> {
            /// Wrap an implementation core
            pub fn new(core: Arc<dyn InstrumentCore<T>>) -> Self {
                Self { core }
            }

            /// Handle that discards every recording
            pub fn noop() -> Self {
                Self::new(Arc::new(NoopInstrument))
            }

            /// Whether recordings are discarded
            pub fn is_noop(&self) -> bool {
                self.core.descriptor().is_none()
            }

            /// Descriptor of the backing instrument
            pub fn descriptor(&self) -> Option<&Descriptor> {
                self.core.descriptor()
            }

            #[doc = concat!("Record `value` under `labels`. See [`", stringify!($name), "`].")]
            pub fn $method(&self, value: T, labels: &LabelSet) {
                self.core.record(value, labels);
            }

            /// Pre-bind a label set for repeated recordings
            pub fn bind(&self, labels: &LabelSet) -> $bound<T> {
                $bound {
                    core: Arc::clone(&self.core),
                    labels: labels.clone(),
                }
            }
        }

        impl<T: Numeric> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    core: Arc::clone(&self.core),
                }
            }
        }

        impl<T: Numeric> std::fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("descriptor", &self.core.descriptor())
                    .finish()
            }
        }

        #[doc = concat!("[`", stringify!($name), "`] with a fixed label set.")]
        pub struct $bound<T: Numeric> {
            core: Arc<dyn InstrumentCore<T>>,
            labels: LabelSet,
        }

        impl<T: Numeric> $bound<T> {
            /// Record `value` under the bound label set
            pub fn $method(&self, value: T) {
                self.core.record(value, &self.labels);
            }

            /// The bound label set
            pub fn labels(&self) -> &LabelSet {
                &self.labels
            }
        }
    };
}

sync_instrument!(
    /// Cumulative counter. A monotonic counter drops negative deltas.
    Counter,
    BoundCounter,
    add
);

sync_instrument!(
    /// Measure contributing to a sum/count/min/max summary. An absolute
    /// measure drops negative values.
    Measure,
    BoundMeasure,
    record
);

/// Callback registered with an observer; invoked once per collection.
pub type ObserverCallback<T> = Box<dyn Fn(&ObserverResult<T>) + Send + Sync>;

/// Passed to observer callbacks to report observations.
pub struct ObserverResult<T: Numeric> {
    core: Arc<dyn InstrumentCore<T>>,
}

impl<T: Numeric> ObserverResult<T> {
    /// Wrap an implementation core
    pub fn new(core: Arc<dyn InstrumentCore<T>>) -> Self {
        Self { core }
    }

    /// Report the current value for `labels`
    pub fn observe(&self, value: T, labels: &LabelSet) {
        self.core.record(value, labels);
    }
}

/// Handle to a registered observer.
///
/// Observers do not record imperatively; the handle only identifies the
/// instrument the callback reports into.
pub struct Observer<T: Numeric> {
    descriptor: Option<Descriptor>,
    _number: PhantomData<fn(T)>,
}

impl<T: Numeric> Observer<T> {
    /// Handle for a live observer
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor: Some(descriptor),
            _number: PhantomData,
        }
    }

    /// Handle for an observer whose callback is never invoked
    pub fn noop() -> Self {
        Self {
            descriptor: None,
            _number: PhantomData,
        }
    }

    /// Whether the callback is discarded
    pub fn is_noop(&self) -> bool {
        self.descriptor.is_none()
    }

    /// Descriptor of the backing instrument
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }
}

impl<T: Numeric> std::fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<(i64, LabelSet)>>,
    }

    impl InstrumentCore<i64> for Recording {
        fn descriptor(&self) -> Option<&Descriptor> {
            None
        }

        fn record(&self, value: i64, labels: &LabelSet) {
            self.seen.lock().push((value, labels.clone()));
        }
    }

    #[test]
    fn test_bound_counter_forwards_labels() {
        let core = Arc::new(Recording::default());
        let counter = Counter::new(Arc::clone(&core) as Arc<dyn InstrumentCore<i64>>);
        let labels = LabelSet::new([("k", "v")]);

        let bound = counter.bind(&labels);
        bound.add(3);
        counter.add(4, &LabelSet::empty());

        let seen = core.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (3, labels));
        assert_eq!(seen[1], (4, LabelSet::empty()));
    }

    #[test]
    fn test_noop_handles() {
        let counter = Counter::<f64>::noop();
        counter.add(1.0, &LabelSet::empty());
        assert!(counter.is_noop());
        assert!(Measure::<i64>::noop().is_noop());
        assert!(Observer::<i64>::noop().is_noop());
    }
}
