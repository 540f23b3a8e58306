use std::collections::HashMap;

pub type SurrogateKey = u32;

/// Mapping from natural (business) keys to surrogate integers, densely
/// covering `1..=N` for the N distinct non-null values it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMapping {
    map: HashMap<String, SurrogateKey>,
}

impl KeyMapping {

    /// Assigns 1-based keys to distinct non-null values in order of first
    /// occurrence. The same sequence always produces the same mapping; a
    /// reordered sequence may permute the assignments.
    pub fn build<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut map = HashMap::new();
        let mut next: SurrogateKey = 1;
        for value in values {
            let Some(value) = value else {
                continue;
            };
            if !map.contains_key(value) {
                map.insert(value.to_string(), next);
                next += 1;
            }
        }
        KeyMapping { map }
    }

    /// Null and unmapped values resolve to `None`; an unmapped value is an
    /// expected outcome, not an error.
    pub fn resolve(&self, value: Option<&str>) -> Option<SurrogateKey> {
        value.and_then(|v| self.map.get(v).copied())
    }

    /// Vectorized [`resolve`](Self::resolve); output length always equals
    /// input length, so a keyed column can be attached 1:1 to a table.
    pub fn resolve_many<'a, I>(&self, values: I) -> Vec<Option<SurrogateKey>>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        values.into_iter().map(|value| self.resolve(value)).collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Per-entity key mappings, built in dependency order and handed explicitly
/// to each materializer. Resolving through an entity that has not been
/// registered behaves like resolving an unmapped key.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    mappings: HashMap<String, KeyMapping>,
}

impl KeyRegistry {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: &str, mapping: KeyMapping) {
        self.mappings.insert(entity.to_string(), mapping);
    }

    pub fn get(&self, entity: &str) -> Option<&KeyMapping> {
        self.mappings.get(entity)
    }

    pub fn resolve(&self, entity: &str, value: Option<&str>) -> Option<SurrogateKey> {
        self.get(entity).and_then(|mapping| mapping.resolve(value))
    }
}

/// The dimension keys one order row resolved to. Order-level facts that
/// only carry the order's natural key pick these up by lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderKeys {
    pub customer: Option<SurrogateKey>,
    pub channel: Option<SurrogateKey>,
    pub store: Option<SurrogateKey>,
}

/// Order natural key -> propagated dimension keys, composed from the order
/// table's reference columns and the already-built dimension mappings.
#[derive(Debug, Default)]
pub struct OrderAssociations {
    by_order: HashMap<String, OrderKeys>,
}

impl OrderAssociations {

    pub fn insert(&mut self, order_id: &str, keys: OrderKeys) {
        self.by_order.entry(order_id.to_string()).or_insert(keys);
    }

    /// An unknown or null order id yields all-null keys.
    pub fn get(&self, order_id: Option<&str>) -> OrderKeys {
        order_id
            .and_then(|id| self.by_order.get(id))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(values: &[Option<&str>]) -> KeyMapping {
        KeyMapping::build(values.iter().copied())
    }

    #[test]
    fn keys_are_dense_and_follow_first_occurrence() {
        let m = mapping(&[Some("C"), Some("A"), Some("C"), Some("B")]);

        assert_eq!(m.len(), 3);
        assert_eq!(m.resolve(Some("C")), Some(1));
        assert_eq!(m.resolve(Some("A")), Some(2));
        assert_eq!(m.resolve(Some("B")), Some(3));
    }

    #[test]
    fn nulls_are_excluded_from_the_domain() {
        let m = mapping(&[None, Some("A"), None, Some("B")]);

        assert_eq!(m.len(), 2);
        assert_eq!(m.resolve(Some("A")), Some(1));
        assert_eq!(m.resolve(None), None);
    }

    #[test]
    fn unmapped_values_resolve_to_none() {
        let m = mapping(&[Some("A")]);
        assert_eq!(m.resolve(Some("missing")), None);
    }

    #[test]
    fn rebuilding_from_the_same_sequence_is_identical() {
        let values = [Some("x"), Some("y"), Some("x"), Some("z")];
        assert_eq!(mapping(&values), mapping(&values));
    }

    #[test]
    fn resolve_many_preserves_row_count() {
        let m = mapping(&[Some("A"), Some("B")]);
        let resolved = m.resolve_many([Some("B"), None, Some("nope"), Some("A")]);

        assert_eq!(resolved, vec![Some(2), None, None, Some(1)]);
    }

    #[test]
    fn registry_without_entity_resolves_to_none() {
        let mut registry = KeyRegistry::new();
        registry.insert("customer", mapping(&[Some("C1")]));

        assert_eq!(registry.resolve("customer", Some("C1")), Some(1));
        assert_eq!(registry.resolve("channel", Some("CH1")), None);
    }

    #[test]
    fn associations_default_to_null_keys() {
        let mut associations = OrderAssociations::default();
        associations.insert(
            "O1",
            OrderKeys {
                customer: Some(4),
                channel: Some(2),
                store: None,
            },
        );

        let found = associations.get(Some("O1"));
        assert_eq!(found.customer, Some(4));
        assert_eq!(found.store, None);

        let missing = associations.get(Some("O2"));
        assert_eq!(missing.customer, None);
        assert_eq!(missing.channel, None);
    }
}
