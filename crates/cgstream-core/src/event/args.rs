//! Tuple conversions between Rust values and event payloads.

use alloc::sync::Arc;

use super::{EventData, ListValue, ValueParse};
use crate::event::value::Value;

/// A tuple that can become an event payload.
///
/// `()` produces no payload, `(a,)` a single value and longer tuples (up to
/// eight elements) a list.
pub trait IntoEventData {
    /// Builds the payload.
    fn into_data(self) -> EventData;
}

/// A tuple shape that an event payload can be checked against and read as.
pub trait EventArgs: Sized {
    /// Number of values in the shape.
    const ARITY: usize;

    /// Returns `true` if `data` has exactly this shape, each value being
    /// readable as the matching element type.
    fn well_formed(data: &EventData) -> bool;

    /// Reads `data` as this shape. Mismatching elements read as defaults.
    fn extract(data: &EventData) -> Self;
}

impl IntoEventData for () {
    fn into_data(self) -> EventData {
        EventData::default()
    }
}

impl EventArgs for () {
    const ARITY: usize = 0;

    /// An empty shape is never well formed.
    fn well_formed(_data: &EventData) -> bool {
        false
    }

    fn extract(_data: &EventData) -> Self {}
}

impl<A: Into<Value>> IntoEventData for (A,) {
    fn into_data(self) -> EventData {
        EventData::Single(self.0.into())
    }
}

impl<A: ValueParse> EventArgs for (A,) {
    const ARITY: usize = 1;

    fn well_formed(data: &EventData) -> bool {
        match data {
            EventData::Single(v) => A::contains(v),
            EventData::List(_) => false,
        }
    }

    fn extract(data: &EventData) -> Self {
        match data {
            EventData::Single(v) => (A::get_value(v),),
            EventData::List(_) => (A::get_value(&Value::None),),
        }
    }
}

fn nth_contains<T: ValueParse>(list: &ListValue, index: usize) -> bool {
    list.get(index).is_some_and(T::contains)
}

fn nth<T: ValueParse>(list: &ListValue, index: usize) -> T {
    list.get(index).map_or_else(|| T::get_value(&Value::None), T::get_value)
}

macro_rules! list_args {
    ($n:expr; $($name:ident $idx:tt),+) => {
        impl<$($name: Into<Value>),+> IntoEventData for ($($name,)+) {
            fn into_data(self) -> EventData {
                let list: ListValue = [$(self.$idx.into()),+].into_iter().collect();
                EventData::List(Arc::new(list))
            }
        }

        impl<$($name: ValueParse),+> EventArgs for ($($name,)+) {
            const ARITY: usize = $n;

            fn well_formed(data: &EventData) -> bool {
                match data {
                    EventData::List(list) => list.len() == $n $(&& nth_contains::<$name>(list, $idx))+,
                    EventData::Single(_) => false,
                }
            }

            fn extract(data: &EventData) -> Self {
                match data {
                    EventData::List(list) => ($(nth::<$name>(list, $idx),)+),
                    EventData::Single(_) => ($($name::get_value(&Value::None),)+),
                }
            }
        }
    };
}

list_args!(2; A 0, B 1);
list_args!(3; A 0, B 1, C 2);
list_args!(4; A 0, B 1, C 2, D 3);
list_args!(5; A 0, B 1, C 2, D 3, E 4);
list_args!(6; A 0, B 1, C 2, D 3, E 4, F 5);
list_args!(7; A 0, B 1, C 2, D 3, E 4, F 5, G 6);
list_args!(8; A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
