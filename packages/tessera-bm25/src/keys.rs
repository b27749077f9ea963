//! Metadata store keys owned by the engine.

pub fn statistics(namespace: &str) -> String {
	format!("bm25.info.{namespace}")
}

pub fn members(namespace: &str) -> String {
	format!("bm25.set.{namespace}")
}

/// The namespace length keeps keys apart when namespaces or ids contain dots.
pub fn document(namespace: &str, id: &str) -> String {
	format!("bm25.document.{}.{namespace}.{id}", namespace.len())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_keys_do_not_collide_across_namespaces() {
		assert_ne!(document("a", "b.c"), document("a.b", "c"));
		assert_eq!(statistics(""), "bm25.info.");
	}
}
