//! Backend payload shapes and their conversion into view data.
//!
//! Every conversion checks the payload's `error` field first: a non-empty value is a
//! domain failure even though the transport call itself succeeded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::QueryError;

fn embedded_error(error: Option<&str>) -> Result<(), QueryError> {
    match error.map(str::trim) {
        Some(message) if !message.is_empty() => Err(QueryError::domain(message)),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroupLabelPayload {
    #[serde(default, alias = "groupLabel")]
    pub group_label: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GroupLabelPayload {
    pub fn into_label(self) -> Result<Option<String>, QueryError> {
        embedded_error(self.error.as_deref())?;
        Ok(self
            .group_label
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NeighborRecord {
    #[serde(alias = "entityId", alias = "protein_id")]
    pub entity_id: String,
    #[serde(default, alias = "cosine_sim")]
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborEntry {
    pub entity_id: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NetworkPayload {
    #[serde(default)]
    pub plot: Value,
    #[serde(default)]
    pub neighbors: Vec<NeighborRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkData {
    pub plot: Value,
    /// Descending by similarity.
    pub neighbors: Vec<NeighborEntry>,
}

impl NetworkData {
    /// Looks a neighbor up by id, ignoring ASCII case.
    pub fn neighbor(&self, entity_id: &str) -> Option<&NeighborEntry> {
        self.neighbors
            .iter()
            .find(|neighbor| neighbor.entity_id.eq_ignore_ascii_case(entity_id))
    }
}

impl NetworkPayload {
    pub fn into_network(self) -> Result<NetworkData, QueryError> {
        embedded_error(self.error.as_deref())?;
        Ok(NetworkData {
            plot: self.plot,
            neighbors: sort_neighbors(self.neighbors),
        })
    }
}

/// Stable sort, descending. Missing or non-finite similarity counts as 0.
pub fn sort_neighbors(records: Vec<NeighborRecord>) -> Vec<NeighborEntry> {
    let mut neighbors: Vec<NeighborEntry> = records
        .into_iter()
        .map(|record| NeighborEntry {
            entity_id: record.entity_id,
            similarity: record
                .similarity
                .filter(|value| value.is_finite())
                .unwrap_or(0.0),
        })
        .collect();
    neighbors.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    neighbors
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DescriptionPayload {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DescriptionPayload {
    pub fn into_description(self) -> Result<Option<String>, QueryError> {
        embedded_error(self.error.as_deref())?;
        Ok(self
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PathwayMemberRecord {
    Id(String),
    Scored {
        #[serde(alias = "pathwayId")]
        pathway_id: String,
        #[serde(default)]
        score: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathwayGroupRecord {
    #[serde(alias = "groupLabel", alias = "Group10")]
    pub group_label: String,
    #[serde(default, alias = "pathways", alias = "pathway_id")]
    pub members: Vec<PathwayMemberRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SharedGroupsPayload {
    #[serde(default)]
    pub groups: Vec<PathwayGroupRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayMember {
    pub pathway_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayGroup {
    pub group_label: String,
    /// Source order.
    pub members: Vec<PathwayMember>,
}

impl SharedGroupsPayload {
    /// Groups in order of first appearance; repeated labels fold into one group.
    pub fn into_groups(self) -> Result<Vec<PathwayGroup>, QueryError> {
        embedded_error(self.error.as_deref())?;
        let mut groups: Vec<PathwayGroup> = Vec::new();
        for record in self.groups {
            let members = record.members.into_iter().map(|member| match member {
                PathwayMemberRecord::Id(pathway_id) => PathwayMember {
                    pathway_id,
                    score: 0.0,
                },
                PathwayMemberRecord::Scored { pathway_id, score } => PathwayMember {
                    pathway_id,
                    score: score.unwrap_or(0.0),
                },
            });
            match groups
                .iter_mut()
                .find(|group| group.group_label == record.group_label)
            {
                Some(group) => group.members.extend(members),
                None => groups.push(PathwayGroup {
                    group_label: record.group_label,
                    members: members.collect(),
                }),
            }
        }
        Ok(groups)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneInfoPayload {
    #[serde(default)]
    pub info: Map<String, Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoCategory {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneInfo {
    pub entity: String,
    pub categories: Vec<InfoCategory>,
}

impl GeneInfoPayload {
    pub fn into_gene_info(self, entity: &str) -> Result<GeneInfo, QueryError> {
        embedded_error(self.error.as_deref())?;
        let categories = self
            .info
            .into_iter()
            .map(|(name, value)| InfoCategory {
                name,
                values: info_values(value),
            })
            .collect();
        Ok(GeneInfo {
            entity: entity.to_string(),
            categories,
        })
    }
}

fn info_values(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(text) => vec![text],
        Value::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProteinsPayload {
    #[serde(default)]
    pub proteins: Vec<String>,
    #[serde(default)]
    pub scores: Vec<Option<f64>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProtein {
    pub id: String,
    pub score: f64,
}

impl ProteinsPayload {
    /// Pairs proteins with scores positionally; a protein without a score gets 0.
    pub fn into_proteins(self) -> Result<Vec<ScoredProtein>, QueryError> {
        embedded_error(self.error.as_deref())?;
        let mut scores = self.scores.into_iter();
        Ok(self
            .proteins
            .into_iter()
            .map(|id| ScoredProtein {
                id,
                score: scores.next().flatten().unwrap_or(0.0),
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Interaction {
    #[serde(alias = "predictionEntity")]
    pub prediction_entity: String,
    #[serde(alias = "genesetEntity")]
    pub geneset_entity: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InteractionsPayload {
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub error: Option<String>,
}

impl InteractionsPayload {
    pub fn into_interactions(self) -> Result<Vec<Interaction>, QueryError> {
        embedded_error(self.error.as_deref())?;
        Ok(self.interactions)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PathwayListPayload {
    #[serde(default)]
    pub pathways: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PathwayListPayload {
    pub fn into_names(self) -> Result<Vec<String>, QueryError> {
        embedded_error(self.error.as_deref())?;
        Ok(self
            .pathways
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DownloadEntry {
    pub filename: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DownloadsPayload(pub Vec<DownloadEntry>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn into_image(self) -> Result<ImagePayload, QueryError> {
        if self.bytes.is_empty() {
            return Err(QueryError::domain("Image not available."));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HealthPayload {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> T {
        serde_json::from_value(value).expect("payload decodes")
    }

    #[test]
    fn neighbors_sort_descending_with_missing_similarity_as_zero() {
        let payload: NetworkPayload = decode(json!({
            "plot": {"data": []},
            "neighbors": [
                {"entityId": "X", "similarity": 0.3},
                {"entityId": "Y", "similarity": 0.9},
                {"protein_id": "Z"},
                {"protein_id": "W", "cosine_sim": 0.5}
            ]
        }));
        let network = payload.into_network().expect("network");
        let order: Vec<&str> = network
            .neighbors
            .iter()
            .map(|neighbor| neighbor.entity_id.as_str())
            .collect();
        assert_eq!(order, vec!["Y", "W", "X", "Z"]);
        assert_eq!(network.neighbor("z").map(|n| n.similarity), Some(0.0));
    }

    #[test]
    fn embedded_error_is_a_domain_failure() {
        let payload: ProteinsPayload = decode(json!({"error": "not found"}));
        assert_eq!(
            payload.into_proteins(),
            Err(QueryError::domain("not found"))
        );

        let blank: ProteinsPayload = decode(json!({"error": "  ", "proteins": [], "scores": []}));
        assert_eq!(blank.into_proteins(), Ok(Vec::new()));
    }

    #[test]
    fn proteins_pair_with_scores_positionally() {
        let payload: ProteinsPayload = decode(json!({
            "proteins": ["TP53", "MDM2", "CDKN1A"],
            "scores": [0.91, null]
        }));
        let proteins = payload.into_proteins().expect("proteins");
        assert_eq!(
            proteins,
            vec![
                ScoredProtein {
                    id: "TP53".to_string(),
                    score: 0.91,
                },
                ScoredProtein {
                    id: "MDM2".to_string(),
                    score: 0.0,
                },
                ScoredProtein {
                    id: "CDKN1A".to_string(),
                    score: 0.0,
                },
            ]
        );
    }

    #[test]
    fn shared_groups_fold_duplicate_labels_and_keep_member_order() {
        let payload: SharedGroupsPayload = decode(json!({
            "groups": [
                {"Group10": "Immune", "pathway_id": ["P2", "P1"]},
                {"groupLabel": "Metabolism", "members": [{"pathwayId": "M1", "score": 0.4}]},
                {"group_label": "Immune", "pathways": ["P0"]}
            ]
        }));
        let groups = payload.into_groups().expect("groups");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_label, "Immune");
        let immune: Vec<&str> = groups[0]
            .members
            .iter()
            .map(|member| member.pathway_id.as_str())
            .collect();
        assert_eq!(immune, vec!["P2", "P1", "P0"]);
        assert_eq!(groups[1].members[0].score, 0.4);
    }

    #[test]
    fn gene_info_keeps_category_order_and_flattens_values() {
        let payload: GeneInfoPayload = decode(json!({
            "info": {
                "location": ["nucleus", "cytoplasm"],
                "function": "transcription factor",
                "aliases": [],
                "length": 393
            }
        }));
        let info = payload.into_gene_info("TP53").expect("info");
        let names: Vec<&str> = info
            .categories
            .iter()
            .map(|category| category.name.as_str())
            .collect();
        assert_eq!(names, vec!["location", "function", "aliases", "length"]);
        assert_eq!(info.categories[0].values, vec!["nucleus", "cytoplasm"]);
        assert_eq!(info.categories[1].values, vec!["transcription factor"]);
        assert!(info.categories[2].values.is_empty());
        assert_eq!(info.categories[3].values, vec!["393"]);
    }

    #[test]
    fn interactions_accept_camel_case_fields() {
        let payload: InteractionsPayload = decode(json!({
            "interactions": [
                {"predictionEntity": "TP53", "genesetEntity": "MDM2", "score": 0.999}
            ]
        }));
        let interactions = payload.into_interactions().expect("interactions");
        assert_eq!(interactions[0].prediction_entity, "TP53");
        assert_eq!(interactions[0].geneset_entity, "MDM2");
    }

    #[test]
    fn group_label_and_description_blank_values_are_absent() {
        let label: GroupLabelPayload = decode(json!({"group_label": " "}));
        assert_eq!(label.into_label(), Ok(None));
        let description: DescriptionPayload = decode(json!({}));
        assert_eq!(description.into_description(), Ok(None));
    }

    #[test]
    fn downloads_decode_from_bare_array() {
        let payload: DownloadsPayload = decode(json!([
            {"filename": "vectors.parquet", "description": "Protein embeddings"}
        ]));
        assert_eq!(payload.0[0].filename, "vectors.parquet");
    }

    #[test]
    fn empty_image_is_unavailable() {
        let image = ImagePayload {
            content_type: "image/png".to_string(),
            bytes: Vec::new(),
        };
        assert!(matches!(image.into_image(), Err(QueryError::Domain(_))));
    }
}
