use serde::Deserialize;

/// Types whose shape decides which optional blocks go into the proposal query.
pub const INTROSPECTED_TYPES: [&str; 5] = [
    "Proposal",
    "ProposalMetadata",
    "ProposalVotes",
    "VotingConfig",
    "ProposalTransactions",
];

const TRANSACTION_KINDS: [&str; 6] = ["created", "active", "queued", "executed", "failed", "canceled"];

const DEFAULT_VOTING_CONFIG_FIELDS: [&str; 6] = [
    "id",
    "cooldownBeforeVotingStart",
    "votingDuration",
    "yesThreshold",
    "yesNoDifferential",
    "minPropositionPower",
];

/// Shape of the single-proposal query sent to the subgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalQuery {
    pub include_transactions: bool,
    /// `None` leaves the `votingConfig` block out.
    pub voting_config_fields: Option<Vec<String>>,
}

impl Default for ProposalQuery {
    fn default() -> Self {
        Self {
            include_transactions: true,
            voting_config_fields: Some(
                DEFAULT_VOTING_CONFIG_FIELDS
                    .iter()
                    .map(|f| f.to_string())
                    .collect(),
            ),
        }
    }
}

impl ProposalQuery {
    pub fn build(&self, proposal_id: &str) -> String {
        let mut query = format!(
            r#"{{
  proposals(where: {{ proposalId: "{proposal_id}" }}) {{
    id
    proposalId
    state
    creator
    accessLevel
    ipfsHash
    votingDuration
    proposalMetadata {{
      title
      rawContent
    }}
    votes {{
      forVotes
      againstVotes
    }}"#
        );

        if let Some(fields) = self.voting_config_fields.as_ref().filter(|f| !f.is_empty()) {
            query.push_str("\n    votingConfig {\n");
            for field in fields {
                query.push_str(&format!("      {field}\n"));
            }
            query.push_str("    }");
        }

        if self.include_transactions {
            query.push_str("\n    transactions {\n      id\n");
            for kind in TRANSACTION_KINDS {
                query.push_str(&format!(
                    "      {kind} {{\n        id\n        timestamp\n        blockNumber\n      }}\n"
                ));
            }
            query.push_str("    }");
        }

        query.push_str("\n  }\n}");
        query
    }
}

pub fn introspection_query(type_name: &str) -> String {
    format!(
        r#"query Introspect{type_name} {{
  __type(name: "{type_name}") {{
    name
    kind
    fields {{
      name
      description
      type {{
        name
        kind
        ofType {{
          name
          kind
          ofType {{
            name
            kind
          }}
        }}
      }}
    }}
  }}
}}"#
    )
}

#[derive(Deserialize, Debug)]
pub struct IntrospectionData {
    #[serde(rename = "__type")]
    pub type_info: Option<IntrospectedType>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct IntrospectedType {
    pub name: String,
    pub kind: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<IntrospectedField>>,
}

impl IntrospectedType {
    pub fn field_list(&self) -> &[IntrospectedField] {
        self.fields.as_deref().unwrap_or_default()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct IntrospectedField {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    /// Innermost named type, falling back to the wrapper kind.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.of_type.as_ref().and_then(|inner| inner.name.clone()))
            .or_else(|| self.kind.clone())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Scalars and enums can be selected without a sub-selection.
    pub fn is_leaf(&self) -> bool {
        match self.kind.as_deref() {
            Some("NON_NULL") => self.of_type.as_ref().is_some_and(|inner| inner.is_leaf()),
            Some("SCALAR") | Some("ENUM") => true,
            _ => false,
        }
    }
}

/// What introspection found, in `INTROSPECTED_TYPES` order.
#[derive(Debug, Default)]
pub struct SchemaInfo {
    pub types: Vec<(String, Option<IntrospectedType>)>,
}

impl SchemaInfo {
    pub fn get(&self, type_name: &str) -> Option<&IntrospectedType> {
        self.types
            .iter()
            .find(|(name, _)| name == type_name)
            .and_then(|(_, info)| info.as_ref())
    }

    pub fn proposal_query(&self) -> ProposalQuery {
        let include_transactions = self
            .get("ProposalTransactions")
            .is_some_and(|t| !t.field_list().is_empty());

        let voting_config_fields = self
            .get("VotingConfig")
            .map(|t| {
                t.field_list()
                    .iter()
                    .filter(|f| f.type_ref.is_leaf())
                    .map(|f| f.name.clone())
                    .collect::<Vec<_>>()
            })
            .filter(|fields| !fields.is_empty());

        ProposalQuery {
            include_transactions,
            voting_config_fields,
        }
    }
}
