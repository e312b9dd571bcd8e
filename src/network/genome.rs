use serde::{Serialize, Deserialize};

use crate::network::parameter_set::TensorId;

/// One crossover position: a weight tensor and its paired bias tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub weight: TensorId,
    pub bias: TensorId,
}

/// A named group of genes, indexed by depth position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeBlock {
    pub name: String,
    pub genes: Vec<Gene>,
}

/// Partition of a `ParameterSet` into crossover blocks.
///
/// Every network built from the same `NetworkSpec` has an identical genome,
/// which is what makes swapping a gene between two networks meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    pub blocks: Vec<GenomeBlock>,
}

impl Genome {
    /// Appends a block; empty blocks are skipped so every block can be sampled.
    pub fn push_block(&mut self, name: &str, genes: Vec<Gene>) {
        if !genes.is_empty() {
            self.blocks.push(GenomeBlock { name: name.to_owned(), genes });
        }
    }

    pub fn block(&self, name: &str) -> Option<&GenomeBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every tensor referenced by the genome, block by block.
    pub fn tensors(&self) -> impl Iterator<Item = TensorId> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| b.genes.iter())
            .flat_map(|g| [g.weight, g.bias])
    }
}
