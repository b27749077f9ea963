const SHARD_SUFFIX: &str = ".shard";

/// Backing namespace of one partition. Partition zero keeps the bare name.
pub fn backing_namespace(namespace: &str, partition: usize) -> String {
	if partition == 0 {
		namespace.to_string()
	} else {
		format!("{namespace}.{partition}{SHARD_SUFFIX}")
	}
}

/// Splits a backing namespace into its logical namespace and partition index.
pub fn parse_backing_namespace(backing: &str) -> (&str, usize) {
	let parsed = backing.strip_suffix(SHARD_SUFFIX).and_then(|rest| rest.rsplit_once('.')).and_then(
		|(namespace, index)| match index.parse::<usize>() {
			Ok(index) if index > 0 => Some((namespace, index)),
			_ => None,
		},
	);

	parsed.unwrap_or((backing, 0))
}

pub fn partition_count(width: usize, dimension: usize) -> usize {
	if dimension == 0 { 1 } else { width.div_ceil(dimension).max(1) }
}

/// Cuts `vector` into `partitions` chunks of `dimension` values, zero-padding the tail.
pub fn split(vector: &[f32], dimension: usize, partitions: usize) -> Vec<Vec<f32>> {
	(0..partitions)
		.map(|partition| {
			let start = (partition * dimension).min(vector.len());
			let end = ((partition + 1) * dimension).min(vector.len());
			let mut chunk = vector[start..end].to_vec();

			chunk.resize(dimension, 0.0);

			chunk
		})
		.collect()
}

pub fn is_zero(chunk: &[f32]) -> bool {
	chunk.iter().all(|value| *value == 0.0)
}
