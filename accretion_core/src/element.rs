// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element descriptions — the input vocabulary of the reconciler.
//!
//! An [`Element`] describes one node the caller wants on screen: a host
//! element (addressed by its string kind), a user component (a render
//! callback), or a fragment. Children are [`Child`] values; plain data
//! ([`PropValue`]) doubles as text content, so `Child::Value` covers text
//! leaves, "render nothing" markers (`Null`, `Bool`), and the invalid-child
//! case (`Map`) that the differ reports as an error.
//!
//! Descriptions are inert data. The reconciler never mutates an `Element`;
//! it clones the pieces it needs into work nodes.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use crate::hooks::HookContext;
use crate::host::HostHandle;

/// Stable identity key for keyed reconciliation.
pub type Key = String;

/// Attribute map for host elements.
pub type PropMap = BTreeMap<String, PropValue>;

/// A plain data value carried in props or used directly as a child.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Absent value; renders nothing as a child.
    Null,
    /// Boolean; renders nothing as a child (conditional-render idiom).
    Bool(bool),
    /// Integer; renders as text when used as a child.
    Int(i64),
    /// Float; renders as text when used as a child.
    Float(f64),
    /// String; renders as text when used as a child (empty renders nothing).
    Str(String),
    /// Homogeneous or mixed list of values.
    List(Vec<PropValue>),
    /// String-keyed map. Not renderable as a child.
    Map(BTreeMap<String, PropValue>),
}

impl PropValue {
    /// Returns the text content this value renders as, or `None` if it is not
    /// a text child (empty strings render nothing).
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Str(s) if !s.is_empty() => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Float(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Short name of this value's kind, used in error reports.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::Str(String::from(s))
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A shared mutable slot that a host ref is attached to after commit.
pub type RefObject = Rc<Cell<Option<HostHandle>>>;

/// A ref attachment target: either a shared slot or a callback invoked with
/// `Some(handle)` on attach and `None` on detach.
#[derive(Clone)]
pub enum RefValue {
    /// Attach by storing the handle into a shared cell.
    Object(RefObject),
    /// Attach by invoking a callback.
    Callback(Rc<dyn Fn(Option<HostHandle>)>),
}

impl RefValue {
    /// Creates a fresh [`RefObject`] slot.
    #[must_use]
    pub fn object() -> RefObject {
        Rc::new(Cell::new(None))
    }

    /// Returns whether two refs are the same attachment target (pointer
    /// identity, matching the reconciler's reuse semantics).
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        match (a, b) {
            (Self::Object(x), Self::Object(y)) => Rc::ptr_eq(x, y),
            (Self::Callback(x), Self::Callback(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Returns whether two optional refs are the same attachment target.
    #[must_use]
    pub fn same_opt(a: Option<&Self>, b: Option<&Self>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(x), Some(y)) => Self::same(x, y),
            _ => false,
        }
    }
}

impl fmt::Debug for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(_) => f.write_str("RefValue::Object"),
            Self::Callback(_) => f.write_str("RefValue::Callback"),
        }
    }
}

/// A user component's render callback.
///
/// Invoked once per render pass with a [`HookContext`] scoped to that pass
/// and the props described for this position. Component identity (for reuse
/// during diffing) is the `Rc` pointer, so clone the same `ComponentFn` for
/// every description of the same component.
pub type ComponentFn = Rc<dyn Fn(&mut HookContext<'_>, &Props) -> Child>;

/// Wraps a closure as a [`ComponentFn`].
pub fn component_fn<F>(f: F) -> ComponentFn
where
    F: Fn(&mut HookContext<'_>, &Props) -> Child + 'static,
{
    Rc::new(f)
}

/// Props described for an element: host attributes plus children.
#[derive(Clone, Debug, Default)]
pub struct Props {
    /// Host attributes (data values only).
    pub attrs: PropMap,
    /// Described children in document order.
    pub children: Vec<Child>,
}

/// What kind of node an [`Element`] describes.
#[derive(Clone)]
pub enum ElementKind {
    /// A host element, addressed by its kind string (e.g. `"div"`).
    Host(String),
    /// A user component.
    Component(ComponentFn),
    /// A grouping node with no host presence of its own.
    Fragment,
}

impl ElementKind {
    /// Returns whether two kinds describe the same element type, using
    /// pointer identity for components.
    #[must_use]
    pub fn same_type(a: &Self, b: &Self) -> bool {
        match (a, b) {
            (Self::Host(x), Self::Host(y)) => x == y,
            (Self::Component(x), Self::Component(y)) => Rc::ptr_eq(x, y),
            (Self::Fragment, Self::Fragment) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(kind) => write!(f, "Host({kind})"),
            Self::Component(_) => f.write_str("Component"),
            Self::Fragment => f.write_str("Fragment"),
        }
    }
}

/// One described node in an element tree.
#[derive(Clone, Debug)]
pub struct Element {
    /// What to render here.
    pub kind: ElementKind,
    /// Stable identity among siblings, if any.
    pub key: Option<Key>,
    /// Ref to attach to the materialized host object, if any.
    pub host_ref: Option<RefValue>,
    /// Attributes and children.
    pub props: Props,
}

impl Element {
    /// Describes a host element of the given kind.
    #[must_use]
    pub fn host(kind: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Host(kind.into()),
            key: None,
            host_ref: None,
            props: Props::default(),
        }
    }

    /// Describes a component instance.
    #[must_use]
    pub fn component(func: ComponentFn) -> Self {
        Self {
            kind: ElementKind::Component(func),
            key: None,
            host_ref: None,
            props: Props::default(),
        }
    }

    /// Describes a fragment wrapping the given children.
    #[must_use]
    pub fn fragment(children: Vec<Child>) -> Self {
        Self {
            kind: ElementKind::Fragment,
            key: None,
            host_ref: None,
            props: Props {
                attrs: PropMap::new(),
                children,
            },
        }
    }

    /// Sets the identity key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the host ref.
    #[must_use]
    pub fn with_ref(mut self, host_ref: RefValue) -> Self {
        self.host_ref = Some(host_ref);
        self
    }

    /// Adds one attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.attrs.insert(name.into(), value.into());
        self
    }

    /// Appends one child.
    #[must_use]
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.props.children.push(child.into());
        self
    }

    /// Replaces the child list.
    #[must_use]
    pub fn children(mut self, children: Vec<Child>) -> Self {
        self.props.children = children;
        self
    }
}

/// A described child position.
#[derive(Clone, Debug)]
pub enum Child {
    /// A plain value: text content, a nothing-marker, or invalid data.
    Value(PropValue),
    /// A nested element description.
    Element(Element),
    /// A sequence of children diffed with keyed list reconciliation.
    List(Vec<Child>),
}

impl Child {
    /// A text child.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Value(PropValue::Str(content.into()))
    }

    /// A child that renders nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Value(PropValue::Null)
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<Vec<Child>> for Child {
    fn from(children: Vec<Child>) -> Self {
        Self::List(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_values_render_as_text() {
        assert_eq!(PropValue::from("hi").as_text().as_deref(), Some("hi"));
        assert_eq!(PropValue::Int(42).as_text().as_deref(), Some("42"));
        assert_eq!(PropValue::Str(String::new()).as_text(), None);
        assert_eq!(PropValue::Null.as_text(), None);
        assert_eq!(PropValue::Bool(true).as_text(), None);
    }

    #[test]
    fn component_identity_is_pointer_identity() {
        let a = component_fn(|_, _| Child::empty());
        let b = component_fn(|_, _| Child::empty());
        assert!(ElementKind::same_type(
            &ElementKind::Component(a.clone()),
            &ElementKind::Component(a.clone())
        ));
        assert!(!ElementKind::same_type(
            &ElementKind::Component(a),
            &ElementKind::Component(b)
        ));
    }

    #[test]
    fn host_kinds_compare_by_name() {
        assert!(ElementKind::same_type(
            &ElementKind::Host("div".into()),
            &ElementKind::Host("div".into())
        ));
        assert!(!ElementKind::same_type(
            &ElementKind::Host("div".into()),
            &ElementKind::Host("span".into())
        ));
        assert!(!ElementKind::same_type(
            &ElementKind::Host("div".into()),
            &ElementKind::Fragment
        ));
    }

    #[test]
    fn ref_identity() {
        let slot = RefValue::object();
        let a = RefValue::Object(slot.clone());
        let b = RefValue::Object(slot);
        let c = RefValue::Object(RefValue::object());
        assert!(RefValue::same(&a, &b));
        assert!(!RefValue::same(&a, &c));
        assert!(RefValue::same_opt(None, None));
        assert!(!RefValue::same_opt(Some(&a), None));
    }

    #[test]
    fn builder_composes() {
        let el = Element::host("div")
            .with_key("k")
            .attr("title", "x")
            .child(Child::text("hello"));
        assert_eq!(el.key.as_deref(), Some("k"));
        assert_eq!(
            el.props.attrs.get("title"),
            Some(&PropValue::Str("x".into()))
        );
        assert_eq!(el.props.children.len(), 1);
    }
}
