//! soul-a11y DOM layer
//!
//! A read-only (after construction) markup tree with the capabilities the audit engine
//! consumes: selector parsing and matching, scoped descendant queries, ancestor containment,
//! a flattened tree that composes shadow trees and slots, a visibility predicate, and the
//! shadow boundary classifier.

pub mod errors;
pub mod escape;
pub mod flat;
pub mod html;
pub mod node;
pub mod selector;
pub mod shadow;
pub mod visibility;

pub use errors::{DomError, DomResult};
pub use escape::{escape_ident, escape_string};
pub use flat::{FlatTree, VNodeId, VirtualRef};
pub use node::{Attribute, Document, ElementData, NodeId, NodeKind, ShadowMode, SiblingInfo};
pub use selector::{ElementRef, MatchElement, SelectorList};
pub use shadow::is_shadow_root;
pub use visibility::{InlineVisibility, VisibilityProbe};
