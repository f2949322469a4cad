pub mod entity {
    use std::fmt;
    use thiserror::Error;

    pub type Participant = String;

    /// Unordered pair of two distinct participants. Stored sorted, so `(a, b)` and `(b, a)`
    /// are the same ship.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Ship {
        first: Participant,
        second: Participant,
    }

    #[derive(Debug, Clone, Error, PartialEq)]
    pub enum ShipError {
        #[error("a ship needs two distinct participants, got `{0}` twice")]
        SameParticipant(Participant),
        #[error("participant name is empty")]
        EmptyParticipant,
    }

    impl Ship {
        pub fn new(a: impl Into<Participant>, b: impl Into<Participant>) -> Result<Ship, ShipError> {
            let (a, b) = (a.into(), b.into());
            if a.is_empty() || b.is_empty() {
                return Err(ShipError::EmptyParticipant);
            }
            if a == b {
                return Err(ShipError::SameParticipant(a));
            }
            let (first, second) = if a < b { (a, b) } else { (b, a) };
            Ok(Ship { first, second })
        }

        pub fn first(&self) -> &str {
            &self.first
        }

        pub fn second(&self) -> &str {
            &self.second
        }

        pub fn participants(&self) -> [&str; 2] {
            [&self.first, &self.second]
        }

        pub fn contains(&self, participant: &str) -> bool {
            self.first == participant || self.second == participant
        }

        /// Exact identity match on participant names, never substring containment.
        pub fn shares_participant(&self, other: &Ship) -> bool {
            self.participants().iter().any(|p| other.contains(p))
        }
    }

    impl fmt::Display for Ship {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}/{}", self.first, self.second)
        }
    }
}


pub mod condition {
    pub type Score = f64;
}

pub mod store {
    use std::collections::{BTreeSet, HashMap};
    use super::entity::Ship;
    use super::condition::Score;

    /// Weighted ships handed over by ingestion. One weight per unordered pair.
    #[derive(Debug, Clone, Default)]
    pub struct EntityStore {
        weights: HashMap<Ship, Score>,
    }

    impl EntityStore {
        pub fn new() -> EntityStore {
            EntityStore::default()
        }

        /// Sets the weight of `ship`, returning the previous one.
        pub fn insert(&mut self, ship: Ship, weight: Score) -> Option<Score> {
            self.weights.insert(ship, weight)
        }

        /// Adds `weight` to whatever `ship` already carries.
        pub fn add(&mut self, ship: Ship, weight: Score) {
            *self.weights.entry(ship).or_insert(0.0) += weight;
        }

        pub fn get(&self, ship: &Ship) -> Option<Score> {
            self.weights.get(ship).copied()
        }

        pub fn len(&self) -> usize {
            self.weights.len()
        }

        pub fn is_empty(&self) -> bool {
            self.weights.is_empty()
        }

        pub fn iter(&self) -> impl Iterator<Item = (&Ship, Score)> {
            self.weights.iter().map(|(ship, weight)| (ship, *weight))
        }

        pub fn participants(&self) -> BTreeSet<&str> {
            self.weights.keys().flat_map(|ship| ship.participants()).collect()
        }

        /// Keeps only ships weighing strictly more than `min_weight`. Returns how many were dropped.
        pub fn retain_above(&mut self, min_weight: Score) -> usize {
            let before = self.weights.len();
            self.weights.retain(|_, weight| *weight > min_weight);
            before - self.weights.len()
        }
    }

    impl FromIterator<(Ship, Score)> for EntityStore {
        fn from_iter<T: IntoIterator<Item = (Ship, Score)>>(iter: T) -> Self {
            EntityStore { weights: iter.into_iter().collect() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::entity::{Ship, ShipError};
    use super::store::EntityStore;

    #[test]
    fn ship_is_unordered() {
        let a = Ship::new("Twilight", "Applejack").unwrap();
        let b = Ship::new("Applejack", "Twilight").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.first(), "Applejack");
        assert_eq!(a.to_string(), "Applejack/Twilight");
    }

    #[test]
    fn ship_rejects_degenerate_pairs() {
        assert_eq!(Ship::new("Rarity", "Rarity"), Err(ShipError::SameParticipant("Rarity".into())));
        assert_eq!(Ship::new("", "Rarity"), Err(ShipError::EmptyParticipant));
    }

    #[test]
    fn sharing_uses_exact_names() {
        let ab = Ship::new("Sun", "Moon").unwrap();
        let cd = Ship::new("Sunset", "Moonlight").unwrap();
        let ae = Ship::new("Sun", "Star").unwrap();
        assert!(!ab.shares_participant(&cd));
        assert!(ab.shares_participant(&ae));
        assert!(ae.shares_participant(&ab));
    }

    #[test]
    fn store_merges_and_filters() {
        let mut store = EntityStore::new();
        let ship = Ship::new("A", "B").unwrap();
        store.add(ship.clone(), 60.0);
        store.add(Ship::new("B", "A").unwrap(), 50.0);
        store.insert(Ship::new("C", "D").unwrap(), 100.0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&ship), Some(110.0));
        assert_eq!(store.participants().into_iter().collect::<Vec<_>>(), vec!["A", "B", "C", "D"]);

        assert_eq!(store.retain_above(100.0), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&ship).is_some());
    }
}
