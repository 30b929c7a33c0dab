//! Hub bundles: several optional values carried through one connection.
//!
//! A bundle has a fixed number of slots. Each slot holds one [`Value`];
//! [`Value::None`] marks a slot that received nothing. Slots are never
//! reordered, renamed or coerced.

use crate::core::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of slots in a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleArity {
    /// Six slots (`HUB6IN1`)
    Six,
    /// Eight slots (`HUB8IN1`)
    Eight,
}

impl BundleArity {
    /// Both supported arities.
    pub const ALL: [BundleArity; 2] = [BundleArity::Six, BundleArity::Eight];

    /// Number of slots.
    pub const fn slots(self) -> usize {
        match self {
            BundleArity::Six => 6,
            BundleArity::Eight => 8,
        }
    }

    /// Nominal handle type name shown to users.
    pub fn handle_name(self) -> &'static str {
        match self {
            BundleArity::Six => "HUB6IN1",
            BundleArity::Eight => "HUB8IN1",
        }
    }

    /// Port name of the bundle on both sides of the pair.
    pub fn port_name(self) -> &'static str {
        match self {
            BundleArity::Six => "hub_6in1",
            BundleArity::Eight => "hub_8in1",
        }
    }
}

impl fmt::Display for BundleArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle_name())
    }
}

/// An ordered, fixed-capacity group of optional values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    arity: BundleArity,
    slots: Vec<Value>,
}

impl Bundle {
    /// A bundle with every slot absent.
    pub fn empty(arity: BundleArity) -> Self {
        Self {
            arity,
            slots: vec![Value::None; arity.slots()],
        }
    }

    /// Pack exactly `arity.slots()` optional values, in order.
    ///
    /// `None` and `Some(Value::None)` both produce an absent slot.
    pub fn pack<I>(arity: BundleArity, values: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        let slots: Vec<Value> = values
            .into_iter()
            .map(|v| v.unwrap_or(Value::None))
            .collect();

        if slots.len() != arity.slots() {
            return Err(format!(
                "{} expects {} values, got {}",
                arity,
                arity.slots(),
                slots.len()
            ));
        }

        Ok(Self { arity, slots })
    }

    /// Arity of this bundle.
    pub fn arity(&self) -> BundleArity {
        self.arity
    }

    /// All slots in order.
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// A single slot.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)
    }

    /// Whether a slot holds a value.
    pub fn is_present(&self, index: usize) -> bool {
        self.get(index).map_or(false, |v| !v.is_none())
    }

    /// Number of slots holding a value.
    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|v| !v.is_none()).count()
    }

    /// Unpack into the slot values, absent slots as [`Value::None`].
    pub fn unpack(self) -> Vec<Value> {
        self.slots
    }
}
