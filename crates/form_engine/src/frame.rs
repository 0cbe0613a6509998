use std::collections::HashMap;

use form_config::FrameSpec;

use crate::errors::SchemaError;

/// A frame and what it directly contains.
#[derive(Debug, Clone)]
pub(crate) struct FrameNode {
    pub(crate) spec: FrameSpec,
    pub(crate) fields: Vec<usize>,
    pub(crate) collections: Vec<usize>,
    pub(crate) children: Vec<usize>,
}

/// Frame containment, used to enable or disable whole groups of controls.
#[derive(Debug, Clone, Default)]
pub(crate) struct FrameTable {
    nodes: Vec<FrameNode>,
    index: HashMap<String, usize>,
}

impl FrameTable {
    pub(crate) fn new(specs: &[FrameSpec]) -> Result<Self, SchemaError> {
        let mut table = Self::default();
        for spec in specs {
            if table.index.contains_key(&spec.name) {
                return Err(SchemaError::DuplicateName {
                    scope: "frame",
                    name: spec.name.clone(),
                });
            }
            table.index.insert(spec.name.clone(), table.nodes.len());
            table.nodes.push(FrameNode {
                spec: spec.clone(),
                fields: Vec::new(),
                collections: Vec::new(),
                children: Vec::new(),
            });
        }

        for ix in 0..table.nodes.len() {
            let Some(parent) = table.nodes[ix].spec.parent.clone() else {
                continue;
            };
            let parent_ix = table.resolve(&table.nodes[ix].spec.name, &parent)?;
            table.nodes[parent_ix].children.push(ix);
        }

        for ix in 0..table.nodes.len() {
            table.check_ancestry(ix)?;
        }
        Ok(table)
    }

    fn check_ancestry(&self, start: usize) -> Result<(), SchemaError> {
        let mut current = start;
        for _ in 0..self.nodes.len() {
            let Some(parent) = &self.nodes[current].spec.parent else {
                return Ok(());
            };
            current = self.index[parent];
            if current == start {
                break;
            }
        }
        Err(SchemaError::FrameCycle {
            frame: self.nodes[start].spec.name.clone(),
        })
    }

    /// Index of `frame`, referenced by `owner`.
    pub(crate) fn resolve(&self, owner: &str, frame: &str) -> Result<usize, SchemaError> {
        self.index
            .get(frame)
            .copied()
            .ok_or_else(|| SchemaError::UnknownFrame {
                owner: owner.to_string(),
                frame: frame.to_string(),
            })
    }

    pub(crate) fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn add_field(&mut self, frame: usize, field: usize) {
        self.nodes[frame].fields.push(field);
    }

    pub(crate) fn add_collection(&mut self, frame: usize, collection: usize) {
        self.nodes[frame].collections.push(collection);
    }

    pub(crate) fn specs(&self) -> impl Iterator<Item = &FrameSpec> {
        self.nodes.iter().map(|node| &node.spec)
    }

    /// Fields and collections inside `frame`, including nested frames.
    pub(crate) fn members(&self, frame: usize) -> (Vec<usize>, Vec<usize>) {
        let mut fields = Vec::new();
        let mut collections = Vec::new();
        let mut stack = vec![frame];
        while let Some(ix) = stack.pop() {
            let node = &self.nodes[ix];
            fields.extend(&node.fields);
            collections.extend(&node.collections);
            stack.extend(node.children.iter().rev());
        }
        fields.sort_unstable();
        (fields, collections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::frame;

    fn child(name: &str, parent: &str) -> FrameSpec {
        let mut spec = frame(name);
        spec.parent = Some(parent.to_string());
        spec
    }

    #[test]
    fn members_are_collected_recursively() {
        let mut table =
            FrameTable::new(&[frame("outer"), child("inner", "outer"), frame("other")]).unwrap();
        table.add_field(0, 0);
        table.add_field(1, 2);
        table.add_field(2, 1);
        table.add_collection(1, 0);
        assert_eq!(table.members(0), (vec![0, 2], vec![0]));
        assert_eq!(table.members(1), (vec![2], vec![0]));
    }

    #[test]
    fn duplicate_unknown_and_cyclic_frames_are_rejected() {
        assert!(matches!(
            FrameTable::new(&[frame("a"), frame("a")]),
            Err(SchemaError::DuplicateName { scope: "frame", .. })
        ));
        assert!(matches!(
            FrameTable::new(&[child("a", "missing")]),
            Err(SchemaError::UnknownFrame { .. })
        ));
        assert!(matches!(
            FrameTable::new(&[child("a", "b"), child("b", "a")]),
            Err(SchemaError::FrameCycle { .. })
        ));
    }
}
