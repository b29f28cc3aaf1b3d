use std::collections::HashMap;

/// Looks up images referenced by name.
///
/// Codecs only carry texture names around; resolving them to loaded images is up to the host.
pub trait TextureResolver {
	type Handle;

	fn resolve(&mut self, name: &str) -> Option<Self::Handle>;
}

/// A resolver backed by images the host already loaded
impl<H> TextureResolver for HashMap<String, H>
where
	H: Clone,
{
	type Handle = H;

	fn resolve(&mut self, name: &str) -> Option<H> {
		self.get(name).cloned()
	}
}

/// Resolves every name, returning the found handles and the names that could not be resolved
pub fn resolve_all<'a, R, I>(resolver: &mut R, names: I) -> (HashMap<String, R::Handle>, Vec<String>)
where
	R: TextureResolver + ?Sized,
	I: IntoIterator<Item = &'a str>,
{
	let mut found = HashMap::new();
	let mut missing = vec![];

	for name in names {
		if found.contains_key(name) {
			continue;
		}

		match resolver.resolve(name) {
			Some(handle) => {
				found.insert(name.to_string(), handle);
			},
			None => missing.push(name.to_string()),
		}
	}

	(found, missing)
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	#[test]
	fn test_resolve_all() {
		let mut images = HashMap::new();
		images.insert("asphalt.png".to_string(), 1u32);
		images.insert("grass.png".to_string(), 2u32);

		let (found, missing) = super::resolve_all(&mut images,
			vec!["asphalt.png", "tree.png", "asphalt.png"]);
		assert_eq!(found.len(), 1);
		assert_eq!(found["asphalt.png"], 1);
		assert_eq!(missing, vec!["tree.png".to_string()]);
	}
}
