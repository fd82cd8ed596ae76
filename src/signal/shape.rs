//! Terminal shape declarations and their resolved form.
//!
//! A behaviour declares its terminals as named singles, buses and buses
//! of buses. The declaration is resolved once, when the component is
//! built, into a flat terminal list plus a name lookup table.

use std::collections::BTreeMap;

use crate::registry::TerminalId;

use super::terminal::{TerminalDirection, TerminalLabel};

// ── Declarations ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Single,
    /// A bus of `width` terminals.
    Group(usize),
    /// A bus of buses, one width per inner bus.
    NestedGroup(Vec<usize>),
}

/// One named entry of a behaviour's terminal declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeDecl {
    pub name: String,
    pub shape: Shape,
}

impl ShapeDecl {
    pub fn single(name: impl Into<String>) -> Self {
        ShapeDecl {
            name: name.into(),
            shape: Shape::Single,
        }
    }

    pub fn group(name: impl Into<String>, width: usize) -> Self {
        ShapeDecl {
            name: name.into(),
            shape: Shape::Group(width),
        }
    }

    pub fn nested(name: impl Into<String>, widths: Vec<usize>) -> Self {
        ShapeDecl {
            name: name.into(),
            shape: Shape::NestedGroup(widths),
        }
    }
}

/// Name of the `i`-th inner bus of a nested group.
pub fn nested_group_name(name: &str, i: usize) -> String {
    format!("{}.{}", name, i)
}

/// Flat terminal labels for a declaration, in declaration order.
pub fn flat_labels(decls: &[ShapeDecl]) -> Vec<TerminalLabel> {
    let mut labels = Vec::new();
    for decl in decls {
        match &decl.shape {
            Shape::Single => labels.push(TerminalLabel::Single(decl.name.clone())),
            Shape::Group(width) => {
                labels.extend((0..*width).map(|index| TerminalLabel::Grouped {
                    group: decl.name.clone(),
                    index,
                }));
            }
            Shape::NestedGroup(widths) => {
                for (i, width) in widths.iter().enumerate() {
                    let group = nested_group_name(&decl.name, i);
                    labels.extend((0..*width).map(|index| TerminalLabel::Grouped {
                        group: group.clone(),
                        index,
                    }));
                }
            }
        }
    }
    labels
}

/// Total number of terminals a declaration expands to.
pub fn flat_width(decls: &[ShapeDecl]) -> usize {
    decls
        .iter()
        .map(|d| match &d.shape {
            Shape::Single => 1,
            Shape::Group(width) => *width,
            Shape::NestedGroup(widths) => widths.iter().sum(),
        })
        .sum()
}

// ── Resolved form ─────────────────────────────────────────────────────

/// A declaration entry resolved to positions in the flat terminal list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedShape {
    Single(usize),
    Group(Vec<usize>),
    NestedGroup(Vec<Vec<usize>>),
}

/// A named, ordered bus of terminals of one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusGroup {
    pub name: String,
    pub direction: TerminalDirection,
    pub members: Vec<TerminalId>,
}

impl BusGroup {
    pub fn get(&self, index: usize) -> Option<TerminalId> {
        self.members.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// All terminals of one direction belonging to a component.
#[derive(Debug, Clone)]
pub struct TerminalSet {
    direction: TerminalDirection,
    flat: Vec<TerminalId>,
    labels: Vec<TerminalLabel>,
    shapes: BTreeMap<String, ResolvedShape>,
    groups: Vec<BusGroup>,
}

impl TerminalSet {
    /// Resolve `decls` over `ids`, which must be in flat label order.
    ///
    /// Callers check `ids.len()` against [`flat_labels`] beforehand.
    pub fn resolve(direction: TerminalDirection, decls: &[ShapeDecl], ids: Vec<TerminalId>) -> Self {
        let labels = flat_labels(decls);
        debug_assert_eq!(labels.len(), ids.len());
        let mut shapes = BTreeMap::new();
        let mut groups = Vec::new();
        let mut next = 0usize;
        let mut take = |n: usize| {
            let range: Vec<usize> = (next..next + n).collect();
            next += n;
            range
        };
        let members = |range: &[usize]| -> Vec<TerminalId> {
            range.iter().filter_map(|i| ids.get(*i).copied()).collect()
        };
        for decl in decls {
            let resolved = match &decl.shape {
                Shape::Single => ResolvedShape::Single(take(1)[0]),
                Shape::Group(width) => {
                    let range = take(*width);
                    groups.push(BusGroup {
                        name: decl.name.clone(),
                        direction,
                        members: members(&range),
                    });
                    ResolvedShape::Group(range)
                }
                Shape::NestedGroup(widths) => {
                    let mut inner = Vec::with_capacity(widths.len());
                    for (i, width) in widths.iter().enumerate() {
                        let range = take(*width);
                        groups.push(BusGroup {
                            name: nested_group_name(&decl.name, i),
                            direction,
                            members: members(&range),
                        });
                        inner.push(range);
                    }
                    ResolvedShape::NestedGroup(inner)
                }
            };
            shapes.insert(decl.name.clone(), resolved);
        }
        TerminalSet {
            direction,
            flat: ids,
            labels,
            shapes,
            groups,
        }
    }

    pub fn direction(&self) -> TerminalDirection {
        self.direction
    }

    /// Every terminal, flattened in declaration order.
    pub fn all(&self) -> &[TerminalId] {
        &self.flat
    }

    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn shape(&self, name: &str) -> Option<&ResolvedShape> {
        self.shapes.get(name)
    }

    /// The terminal declared as single `name`.
    pub fn single(&self, name: &str) -> Option<TerminalId> {
        match self.shapes.get(name)? {
            ResolvedShape::Single(i) => self.flat.get(*i).copied(),
            _ => None,
        }
    }

    /// The bus `name`; inner buses of a nested group are named `name.i`.
    pub fn group(&self, name: &str) -> Option<&BusGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn groups(&self) -> &[BusGroup] {
        &self.groups
    }

    pub fn label_of(&self, id: TerminalId) -> Option<&TerminalLabel> {
        let pos = self.flat.iter().position(|t| *t == id)?;
        self.labels.get(pos)
    }

    pub fn find_label(&self, label: &TerminalLabel) -> Option<TerminalId> {
        let pos = self.labels.iter().position(|l| l == label)?;
        self.flat.get(pos).copied()
    }

    /// `(id, label)` pairs in flat order.
    pub fn iter(&self) -> impl Iterator<Item = (TerminalId, &TerminalLabel)> + '_ {
        self.flat.iter().copied().zip(self.labels.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<u32>) -> Vec<TerminalId> {
        range.map(TerminalId::new).collect()
    }

    fn decls() -> Vec<ShapeDecl> {
        vec![
            ShapeDecl::single("clk"),
            ShapeDecl::group("D", 3),
            ShapeDecl::nested("M", vec![2, 1]),
        ]
    }

    #[test]
    fn test_flat_labels_order() {
        let labels = flat_labels(&decls());
        assert_eq!(labels.len(), 7);
        assert_eq!(flat_width(&decls()), 7);
        assert_eq!(labels[0], TerminalLabel::Single("clk".into()));
        assert_eq!(labels[3], TerminalLabel::Grouped { group: "D".into(), index: 2 });
        assert_eq!(labels[6], TerminalLabel::Grouped { group: "M.1".into(), index: 0 });
    }

    #[test]
    fn test_resolve_lookup_table() {
        let set = TerminalSet::resolve(TerminalDirection::Input, &decls(), ids(10..17));
        assert_eq!(set.len(), 7);
        assert_eq!(set.single("clk"), Some(TerminalId::new(10)));
        assert_eq!(set.single("D"), None);
        let d = set.group("D").unwrap();
        assert_eq!(d.members, ids(11..14));
        assert_eq!(d.get(1), Some(TerminalId::new(12)));
        assert_eq!(d.get(3), None);
        assert_eq!(set.group("M.0").unwrap().members, ids(14..16));
        assert_eq!(
            set.shape("M"),
            Some(&ResolvedShape::NestedGroup(vec![vec![4, 5], vec![6]]))
        );
    }

    #[test]
    fn test_label_lookup() {
        let set = TerminalSet::resolve(TerminalDirection::Output, &decls(), ids(0..7));
        let label = TerminalLabel::Grouped { group: "D".into(), index: 0 };
        assert_eq!(set.find_label(&label), Some(TerminalId::new(1)));
        assert_eq!(set.label_of(TerminalId::new(1)), Some(&label));
        assert_eq!(set.label_of(TerminalId::new(99)), None);
    }
}
