//! Kanban Column Model (one pipeline stage)

use crate::order::StatusKey;
use crate::wire;
use serde::{Deserialize, Serialize};

/// Kanban column entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanColumn {
    pub id: String,
    /// Status key orders carry while in this column
    #[serde(default)]
    pub status: StatusKey,
    #[serde(default, deserialize_with = "wire::string")]
    pub label: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub color: String,
    #[serde(default, deserialize_with = "wire::int")]
    pub position: i32,
}

/// Update kanban column payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KanbanColumnUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

/// Move the column at `from` to index `to`, then renumber positions 0..n
pub fn reorder_columns(columns: &[KanbanColumn], from: usize, to: usize) -> Vec<KanbanColumn> {
    let mut reordered = columns.to_vec();
    if from < reordered.len() {
        let moved = reordered.remove(from);
        let to = to.min(reordered.len());
        reordered.insert(to, moved);
    }
    for (index, column) in reordered.iter_mut().enumerate() {
        column.position = index as i32;
    }
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(id: &str, position: i32) -> KanbanColumn {
        KanbanColumn {
            id: id.to_string(),
            status: StatusKey::new(id.to_uppercase()).unwrap(),
            label: id.to_string(),
            color: String::new(),
            position,
        }
    }

    #[test]
    fn test_reorder_moves_and_renumbers() {
        let columns = vec![col("a", 0), col("b", 1), col("c", 2)];
        let reordered = reorder_columns(&columns, 0, 2);
        let ids: Vec<_> = reordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        let positions: Vec<_> = reordered.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_reorder_out_of_range_only_renumbers() {
        let columns = vec![col("a", 4), col("b", 9)];
        let reordered = reorder_columns(&columns, 5, 0);
        assert_eq!(reordered[0].id, "a");
        assert_eq!(reordered[1].position, 1);
    }
}
