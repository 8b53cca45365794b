// src/ingest/dom.rs
//! Thin typed layer over `scraper` exposing only what extraction needs:
//! selector lookup, attribute access, text, and ancestor walks.

use std::hash::Hash;
use std::ops::Deref;

use scraper::{ElementRef, Html, Selector};

/// Parsed landing page. Not `Send`; keep it out of `.await` spans.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(raw: &str) -> Self {
        Self {
            html: Html::parse_document(raw),
        }
    }

    /// All elements matching `sel`, in document order.
    pub fn select(&self, sel: &Selector) -> Vec<Node<'_>> {
        self.html.select(sel).map(Node::new).collect()
    }

    pub fn select_first(&self, sel: &Selector) -> Option<Node<'_>> {
        self.html.select(sel).next().map(Node::new)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Node<'a> {
    el: ElementRef<'a>,
}

impl<'a> Node<'a> {
    fn new(el: ElementRef<'a>) -> Self {
        Self { el }
    }

    /// Identity of the underlying tree node, for set membership.
    pub fn key(&self) -> impl Hash + Eq + Copy {
        Deref::deref(&self.el).id()
    }

    pub fn tag(&self) -> &'a str {
        self.el.value().name()
    }

    /// Attribute value, `None` when missing or blank.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.el
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.el.value().classes().any(|c| c == class)
    }

    pub fn has_any_class(&self, classes: &[String]) -> bool {
        classes.iter().any(|c| self.has_class(c))
    }

    /// True when this node or any of its ancestors carries one of `classes`.
    pub fn within_any_class(&self, classes: &[String]) -> bool {
        self.has_any_class(classes) || self.ancestors().any(|a| a.has_any_class(classes))
    }

    /// Descendants matching `sel`, in document order. Never includes `self`.
    pub fn find(&self, sel: &Selector) -> Vec<Node<'a>> {
        let own = self.key();
        self.el
            .select(sel)
            .map(Node::new)
            .filter(|n| n.key() != own)
            .collect()
    }

    pub fn find_first(&self, sel: &Selector) -> Option<Node<'a>> {
        self.find(sel).into_iter().next()
    }

    pub fn matches(&self, sel: &Selector) -> bool {
        sel.matches(&self.el)
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.el.parent().and_then(ElementRef::wrap).map(Node::new)
    }

    /// Element ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> {
        self.el.ancestors().filter_map(ElementRef::wrap).map(Node::new)
    }

    /// Nearest ancestor matching `sel`; `self` excluded.
    pub fn closest_ancestor(&self, sel: &Selector) -> Option<Node<'a>> {
        self.ancestors().find(|a| a.matches(sel))
    }

    /// Raw concatenated text of the subtree.
    pub fn text(&self) -> String {
        self.el.text().collect()
    }

    /// Subtree text skipping every text node that sits under an element
    /// matching `skip` (the element itself is never considered).
    pub fn text_excluding(&self, skip: &Selector) -> String {
        let own = Deref::deref(&self.el).id();
        let mut out = String::new();
        for node in self.el.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .ancestors()
                .take_while(|a| a.id() != own)
                .filter_map(ElementRef::wrap)
                .any(|a| skip.matches(&a));
            if !hidden {
                out.push_str(text);
            }
        }
        out
    }
}
