//! Generic key/value properties attached to every record kind.
//!
//! Format importers and analysis code use these bags to stash metadata that
//! has no dedicated field on a record (chem class, HET flags, scores, ...).
//! Values are a closed sum type; typed accessors check the kind tag
//! explicitly and coerce only within the numeric family.

use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum GenericProp {
    String(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    Vec3(Vector3<f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    String,
    Float,
    Int,
    Bool,
    Vec3,
}

impl GenericProp {
    pub fn kind(&self) -> PropKind {
        match self {
            GenericProp::String(_) => PropKind::String,
            GenericProp::Float(_) => PropKind::Float,
            GenericProp::Int(_) => PropKind::Int,
            GenericProp::Bool(_) => PropKind::Bool,
            GenericProp::Vec3(_) => PropKind::Vec3,
        }
    }
}

impl fmt::Display for PropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PropKind::String => "string",
                PropKind::Float => "float",
                PropKind::Int => "int",
                PropKind::Bool => "bool",
                PropKind::Vec3 => "vec3",
            }
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropError {
    #[error("Unknown property '{key}'")]
    UnknownProperty { key: String },

    #[error("Property '{key}' holds a {found} value, expected {expected}")]
    WrongPropertyKind {
        key: String,
        expected: &'static str,
        found: PropKind,
    },
}

fn wrong_kind(key: &str, expected: &'static str, found: PropKind) -> PropError {
    PropError::WrongPropertyKind {
        key: key.to_string(),
        expected,
        found,
    }
}

/// An ordered string-keyed map of [`GenericProp`] values.
///
/// Typed lookups return `Ok(None)` when the key is absent so that callers can
/// decide between a default and an `UnknownProperty` error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropBag {
    values: BTreeMap<String, GenericProp>,
}

impl PropBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&GenericProp> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: GenericProp) {
        self.values.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<GenericProp> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GenericProp)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, PropError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(GenericProp::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(wrong_kind(key, "string", other.kind())),
        }
    }

    /// Looks up a real value; ints and bools are promoted (`true` → 1.0).
    pub fn float(&self, key: &str) -> Result<Option<f64>, PropError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(GenericProp::Float(v)) => Ok(Some(*v)),
            Some(GenericProp::Int(v)) => Ok(Some(*v as f64)),
            Some(GenericProp::Bool(v)) => Ok(Some(if *v { 1.0 } else { 0.0 })),
            Some(other) => Err(wrong_kind(key, "numeric", other.kind())),
        }
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>, PropError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(GenericProp::Int(v)) => Ok(Some(*v)),
            Some(GenericProp::Bool(v)) => Ok(Some(i64::from(*v))),
            Some(other) => Err(wrong_kind(key, "integer", other.kind())),
        }
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>, PropError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(GenericProp::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_kind(key, "bool", other.kind())),
        }
    }

    pub fn vec3(&self, key: &str) -> Result<Option<Vector3<f64>>, PropError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(GenericProp::Vec3(v)) => Ok(Some(*v)),
            Some(other) => Err(wrong_kind(key, "vec3", other.kind())),
        }
    }
}

fn unknown(key: &str) -> StoreError {
    PropError::UnknownProperty {
        key: key.to_string(),
    }
    .into()
}

/// Typed property access shared by every handle and view kind.
///
/// Implementors only provide access to the (lazily allocated) bag slot of
/// their record; all getters and setters are provided. Bags are created on
/// the first write and dropped again by [`clear_props`](Self::clear_props).
pub trait GenericPropContainer {
    fn with_props<R>(&self, f: impl FnOnce(Option<&PropBag>) -> R) -> Result<R, StoreError>;

    fn with_props_mut<R>(
        &self,
        f: impl FnOnce(&mut Option<PropBag>) -> R,
    ) -> Result<R, StoreError>;

    fn has_prop(&self, key: &str) -> Result<bool, StoreError> {
        self.with_props(|bag| bag.is_some_and(|b| b.contains(key)))
    }

    /// Returns the property keys in sorted order.
    fn get_prop_list(&self) -> Result<Vec<String>, StoreError> {
        self.with_props(|bag| {
            bag.map(|b| b.keys().map(str::to_string).collect::<Vec<_>>())
                .unwrap_or_default()
        })
    }

    fn get_prop_map(&self) -> Result<BTreeMap<String, GenericProp>, StoreError> {
        self.with_props(|bag| {
            bag.map(|b| {
                b.iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default()
        })
    }

    fn remove_prop(&self, key: &str) -> Result<bool, StoreError> {
        self.with_props_mut(|slot| {
            slot.as_mut()
                .map(|b| b.remove(key).is_some())
                .unwrap_or(false)
        })
    }

    fn clear_props(&self) -> Result<(), StoreError> {
        self.with_props_mut(|slot| *slot = None)
    }

    /// Replaces this bag with a deep copy of `other`'s, or clears it when
    /// `other` has no properties.
    fn assign_props_from<O: GenericPropContainer>(&self, other: &O) -> Result<(), StoreError> {
        let copied = other.with_props(|bag| bag.cloned())?;
        self.with_props_mut(|slot| *slot = copied)
    }

    fn set_prop(&self, key: &str, value: GenericProp) -> Result<(), StoreError> {
        self.with_props_mut(|slot| slot.get_or_insert_with(PropBag::new).set(key, value))
    }

    fn set_string_prop(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_prop(key, GenericProp::String(value.to_string()))
    }

    fn set_float_prop(&self, key: &str, value: f64) -> Result<(), StoreError> {
        self.set_prop(key, GenericProp::Float(value))
    }

    fn set_int_prop(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.set_prop(key, GenericProp::Int(value))
    }

    fn set_bool_prop(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set_prop(key, GenericProp::Bool(value))
    }

    fn set_vec3_prop(&self, key: &str, value: Vector3<f64>) -> Result<(), StoreError> {
        self.set_prop(key, GenericProp::Vec3(value))
    }

    fn get_string_prop(&self, key: &str) -> Result<String, StoreError> {
        self.with_props(|bag| bag.map_or(Ok(None), |b| b.string(key)))??
            .ok_or_else(|| unknown(key))
    }

    fn get_string_prop_or(&self, key: &str, default: &str) -> Result<String, StoreError> {
        Ok(self
            .with_props(|bag| bag.map_or(Ok(None), |b| b.string(key)))??
            .unwrap_or_else(|| default.to_string()))
    }

    fn get_float_prop(&self, key: &str) -> Result<f64, StoreError> {
        self.with_props(|bag| bag.map_or(Ok(None), |b| b.float(key)))??
            .ok_or_else(|| unknown(key))
    }

    fn get_float_prop_or(&self, key: &str, default: f64) -> Result<f64, StoreError> {
        Ok(self
            .with_props(|bag| bag.map_or(Ok(None), |b| b.float(key)))??
            .unwrap_or(default))
    }

    fn get_int_prop(&self, key: &str) -> Result<i64, StoreError> {
        self.with_props(|bag| bag.map_or(Ok(None), |b| b.int(key)))??
            .ok_or_else(|| unknown(key))
    }

    fn get_int_prop_or(&self, key: &str, default: i64) -> Result<i64, StoreError> {
        Ok(self
            .with_props(|bag| bag.map_or(Ok(None), |b| b.int(key)))??
            .unwrap_or(default))
    }

    fn get_bool_prop(&self, key: &str) -> Result<bool, StoreError> {
        self.with_props(|bag| bag.map_or(Ok(None), |b| b.bool(key)))??
            .ok_or_else(|| unknown(key))
    }

    fn get_bool_prop_or(&self, key: &str, default: bool) -> Result<bool, StoreError> {
        Ok(self
            .with_props(|bag| bag.map_or(Ok(None), |b| b.bool(key)))??
            .unwrap_or(default))
    }

    fn get_vec3_prop(&self, key: &str) -> Result<Vector3<f64>, StoreError> {
        self.with_props(|bag| bag.map_or(Ok(None), |b| b.vec3(key)))??
            .ok_or_else(|| unknown(key))
    }

    fn get_vec3_prop_or(&self, key: &str, default: Vector3<f64>) -> Result<Vector3<f64>, StoreError> {
        Ok(self
            .with_props(|bag| bag.map_or(Ok(None), |b| b.vec3(key)))??
            .unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Holder {
        slot: RefCell<Option<PropBag>>,
    }

    impl GenericPropContainer for Holder {
        fn with_props<R>(&self, f: impl FnOnce(Option<&PropBag>) -> R) -> Result<R, StoreError> {
            Ok(f(self.slot.borrow().as_ref()))
        }

        fn with_props_mut<R>(
            &self,
            f: impl FnOnce(&mut Option<PropBag>) -> R,
        ) -> Result<R, StoreError> {
            Ok(f(&mut self.slot.borrow_mut()))
        }
    }

    #[test]
    fn bag_is_absent_until_first_write() {
        let holder = Holder::default();
        assert!(holder.slot.borrow().is_none());
        assert!(!holder.has_prop("x").unwrap());
        assert!(holder.get_prop_list().unwrap().is_empty());
        assert!(holder.slot.borrow().is_none());

        holder.set_int_prop("x", 3).unwrap();
        assert!(holder.slot.borrow().is_some());
        assert!(holder.has_prop("x").unwrap());
    }

    #[test]
    fn getters_with_default_return_default_for_missing_keys() {
        let holder = Holder::default();
        assert_eq!(holder.get_float_prop_or("missing", 3.0).unwrap(), 3.0);
        assert_eq!(holder.get_int_prop_or("missing", 7).unwrap(), 7);
        assert!(holder.get_bool_prop_or("missing", true).unwrap());
        assert_eq!(holder.get_string_prop_or("missing", "x").unwrap(), "x");
        assert_eq!(
            holder
                .get_vec3_prop_or("missing", Vector3::new(1.0, 2.0, 3.0))
                .unwrap(),
            Vector3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn getters_without_default_report_unknown_property() {
        let holder = Holder::default();
        let err = holder.get_int_prop("missing").unwrap_err();
        assert_eq!(
            err,
            StoreError::Property(PropError::UnknownProperty {
                key: "missing".to_string()
            })
        );
        holder.set_bool_prop("other", true).unwrap();
        assert!(matches!(
            holder.get_string_prop("missing"),
            Err(StoreError::Property(PropError::UnknownProperty { .. }))
        ));
    }

    #[test]
    fn numeric_getters_coerce_within_the_numeric_family() {
        let holder = Holder::default();
        holder.set_int_prop("count", 4).unwrap();
        holder.set_bool_prop("flag", true).unwrap();
        holder.set_float_prop("score", 2.5).unwrap();

        assert_eq!(holder.get_float_prop("count").unwrap(), 4.0);
        assert_eq!(holder.get_float_prop("flag").unwrap(), 1.0);
        assert_eq!(holder.get_int_prop("flag").unwrap(), 1);
        assert_eq!(holder.get_float_prop_or("flag", 9.0).unwrap(), 1.0);
        assert_eq!(holder.get_float_prop("score").unwrap(), 2.5);
    }

    #[test]
    fn mismatched_kinds_report_wrong_property_kind() {
        let holder = Holder::default();
        holder.set_string_prop("name", "HETATM").unwrap();
        holder.set_float_prop("score", 2.5).unwrap();

        assert!(matches!(
            holder.get_float_prop("name"),
            Err(StoreError::Property(PropError::WrongPropertyKind {
                found: PropKind::String,
                ..
            }))
        ));
        assert!(matches!(
            holder.get_int_prop_or("score", 1),
            Err(StoreError::Property(PropError::WrongPropertyKind {
                expected: "integer",
                found: PropKind::Float,
                ..
            }))
        ));
        assert!(holder.get_bool_prop("score").is_err());
        assert!(holder.get_vec3_prop("name").is_err());
    }

    #[test]
    fn setters_overwrite_regardless_of_previous_kind() {
        let holder = Holder::default();
        holder.set_string_prop("value", "a").unwrap();
        holder.set_float_prop("value", 1.5).unwrap();
        assert_eq!(holder.get_float_prop("value").unwrap(), 1.5);
        assert_eq!(holder.get_prop_list().unwrap(), vec!["value".to_string()]);
    }

    #[test]
    fn remove_and_clear_props() {
        let holder = Holder::default();
        holder.set_int_prop("b", 1).unwrap();
        holder.set_int_prop("a", 2).unwrap();
        assert_eq!(
            holder.get_prop_list().unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        assert!(holder.remove_prop("a").unwrap());
        assert!(!holder.remove_prop("a").unwrap());
        assert_eq!(holder.get_prop_map().unwrap().len(), 1);

        holder.clear_props().unwrap();
        assert!(holder.slot.borrow().is_none());
    }

    #[test]
    fn assign_props_deep_copies_or_clears() {
        let source = Holder::default();
        let target = Holder::default();
        source.set_string_prop("chem_class", "L").unwrap();

        target.assign_props_from(&source).unwrap();
        source.set_string_prop("chem_class", "D").unwrap();
        assert_eq!(target.get_string_prop("chem_class").unwrap(), "L");

        let empty = Holder::default();
        target.assign_props_from(&empty).unwrap();
        assert!(target.slot.borrow().is_none());
    }
}
