//! Nested-list fragments handed to report generators.

use core::fmt::{self, Display, Write as _};

/// Shape of a cluster tree with each leaf replaced by caller content.
///
/// Built by [`super::ClusterNode::traverse_markup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment<T> {
    /// Rendered content for one item.
    Leaf(T),
    /// A branch wrapping its left and right children.
    Pair(Box<Fragment<T>>, Box<Fragment<T>>),
}

impl<T> Fragment<T> {
    /// Leaf contents, left to right.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(f) = stack.pop() {
            match f {
                Fragment::Leaf(t) => out.push(t),
                Fragment::Pair(l, r) => {
                    stack.push(r);
                    stack.push(l);
                }
            }
        }
        out
    }
}

impl<T: Display> Fragment<T> {
    /// Render as nested HTML lists: one `<ul>` per branch, each child in
    /// an `<li>`. Leaf content is written verbatim.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) -> fmt::Result {
        let mut stack = vec![Html::Node(self)];
        while let Some(step) = stack.pop() {
            match step {
                Html::Text(s) => out.push_str(s),
                Html::Node(Fragment::Leaf(t)) => write!(out, "{t}")?,
                Html::Node(Fragment::Pair(l, r)) => {
                    out.push_str("<ul><li>");
                    stack.push(Html::Text("</li></ul>"));
                    stack.push(Html::Node(&**r));
                    stack.push(Html::Text("</li><li>"));
                    stack.push(Html::Node(&**l));
                }
            }
        }
        Ok(())
    }
}

/// Pending work while writing HTML.
enum Html<'a, T> {
    Node(&'a Fragment<T>),
    Text(&'static str),
}
