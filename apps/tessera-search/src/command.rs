use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::{Args, Subcommand};
use color_eyre::eyre;
use serde_json::Value;

use tessera_domain::{Document, DocumentUpdate, Metadata, TextQuery};
use tessera_service::{Target, TesseraService};

/// Namespace and method selection shared by every subcommand.
#[derive(Debug, Args)]
pub struct Scope {
	/// Empty selects the default namespace.
	#[arg(long, short = 'n', default_value = "")]
	pub namespace: String,
	/// One of bm25, semantic, or hybrid.
	#[arg(long, short = 'm', default_value = "hybrid")]
	pub method: Target,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Index documents from a JSON array of `{ id, text, metadata? }`.
	Upsert {
		#[command(flatten)]
		scope: Scope,
		#[arg(long, short = 'f', value_name = "FILE")]
		file: PathBuf,
	},
	/// Change the text, metadata, or vector of one document.
	Update {
		#[command(flatten)]
		scope: Scope,
		#[arg(long)]
		id: String,
		#[arg(long)]
		text: Option<String>,
		/// JSON object, shallow-merged into the stored metadata.
		#[arg(long)]
		metadata: Option<String>,
		/// JSON array of numbers.
		#[arg(long)]
		vector: Option<String>,
	},
	Delete {
		#[command(flatten)]
		scope: Scope,
		#[arg(long, value_delimiter = ',', required = true)]
		ids: Vec<String>,
	},
	Query {
		#[command(flatten)]
		scope: Scope,
		#[arg(long, short = 't')]
		text: Vec<String>,
		/// Defaults to `search.top_k`.
		#[arg(long, short = 'k')]
		top_k: Option<usize>,
		#[arg(long)]
		include_vectors: bool,
		#[arg(long)]
		exclude_metadata: bool,
	},
	/// Remove every document but keep the namespace.
	Reset {
		#[command(flatten)]
		scope: Scope,
	},
	DeleteNamespace {
		#[command(flatten)]
		scope: Scope,
	},
	Namespaces {
		#[arg(long, short = 'm', default_value = "hybrid")]
		method: Target,
	},
	Info {
		#[arg(long, short = 'm', default_value = "hybrid")]
		method: Target,
	},
}
impl Command {
	pub async fn execute(self, service: &TesseraService) -> color_eyre::Result<Value> {
		let output = match self {
			Self::Upsert { scope, file } => {
				let documents = read_documents(&file)?;
				let count = documents.len();

				service.upsert(scope.method, &scope.namespace, documents).await?;

				tracing::info!(
					namespace = scope.namespace.as_str(),
					documents = count,
					"Upserted documents."
				);

				serde_json::json!({ "upserted": count })
			},
			Self::Update { scope, id, text, metadata, vector } => {
				let update = build_update(id, text, metadata.as_deref(), vector.as_deref())?;

				serde_json::to_value(service.update(scope.method, &scope.namespace, update).await?)?
			},
			Self::Delete { scope, ids } =>
				serde_json::to_value(service.delete(scope.method, &scope.namespace, &ids).await?)?,
			Self::Query { scope, text, top_k, include_vectors, exclude_metadata } => {
				if text.is_empty() {
					return Err(eyre::eyre!("At least one --text is required."));
				}

				let top_k = top_k.unwrap_or_else(|| service.top_k());
				let queries: Vec<TextQuery> = text
					.into_iter()
					.map(|text| {
						let mut query = TextQuery::new(text, top_k).include_vectors(include_vectors);

						query.include_metadata = !exclude_metadata;

						query
					})
					.collect();

				if let [query] = queries.as_slice() {
					serde_json::to_value(service.query(scope.method, &scope.namespace, query).await?)?
				} else {
					serde_json::to_value(
						service.query_many(scope.method, &scope.namespace, &queries).await?,
					)?
				}
			},
			Self::Reset { scope } => {
				service.reset(scope.method, &scope.namespace).await?;

				serde_json::json!({ "reset": scope.namespace })
			},
			Self::DeleteNamespace { scope } => {
				service.delete_namespace(scope.method, &scope.namespace).await?;

				serde_json::json!({ "deleted": scope.namespace })
			},
			Self::Namespaces { method } =>
				serde_json::to_value(service.list_namespaces(method).await?)?,
			Self::Info { method } => serde_json::to_value(service.info(method).await?)?,
		};

		Ok(output)
	}
}

fn read_documents(path: &Path) -> color_eyre::Result<Vec<Document>> {
	let raw = fs::read_to_string(path)?;

	Ok(serde_json::from_str(&raw)?)
}

/// Text wins over vector, which wins over a metadata-only change.
pub fn build_update(
	id: String,
	text: Option<String>,
	metadata: Option<&str>,
	vector: Option<&str>,
) -> color_eyre::Result<DocumentUpdate> {
	let metadata = metadata.map(|raw| serde_json::from_str::<Metadata>(raw)).transpose()?;

	match (text, vector, metadata) {
		(Some(text), _, metadata) => Ok(DocumentUpdate::Text { id, text, metadata }),
		(None, Some(vector), None) =>
			Ok(DocumentUpdate::Vector { id, vector: serde_json::from_str(vector)? }),
		(None, None, Some(metadata)) => Ok(DocumentUpdate::Metadata { id, metadata }),
		(None, Some(_), Some(_)) =>
			Err(eyre::eyre!("Update either the vector or the metadata, not both.")),
		(None, None, None) =>
			Err(eyre::eyre!("Nothing to update. Pass --text, --metadata, or --vector.")),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn text_updates_carry_metadata() {
		let update =
			build_update("a".to_string(), Some("new".to_string()), Some(r#"{"k":1}"#), None)
				.expect("Failed to build update.");

		assert_eq!(update, DocumentUpdate::Text {
			id: "a".to_string(),
			text: "new".to_string(),
			metadata: json!({ "k": 1 }).as_object().cloned(),
		});
	}

	#[test]
	fn vector_and_metadata_updates() {
		let vector = build_update("a".to_string(), None, None, Some("[1.0, 2.5]"))
			.expect("Failed to build vector update.");

		assert_eq!(vector, DocumentUpdate::Vector { id: "a".to_string(), vector: vec![1.0, 2.5] });

		let metadata = build_update("a".to_string(), None, Some(r#"{"k":"v"}"#), None)
			.expect("Failed to build metadata update.");

		assert!(matches!(metadata, DocumentUpdate::Metadata { .. }));
	}

	#[test]
	fn rejects_empty_and_ambiguous_updates() {
		assert!(build_update("a".to_string(), None, None, None).is_err());
		assert!(build_update("a".to_string(), None, Some("{}"), Some("[1.0]")).is_err());
		assert!(build_update("a".to_string(), None, Some("[1]"), None).is_err());
	}
}
