use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpeciesId(pub u32);

/// One enemy kind: its level marker, combat stats and patrol body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDef {
    #[serde(skip)]
    pub id: SpeciesId,
    pub def_name: String,
    pub label: String,
    pub marker: char,
    pub max_hit_points: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub vitality: i32,
    pub move_speed: f32,
    pub bounds_width: f32,
    pub bounds_height: f32,
}

#[derive(Debug, Default, Clone)]
pub struct SpeciesDatabase {
    defs: Vec<SpeciesDef>,
    ids_by_name: HashMap<String, SpeciesId>,
    ids_by_marker: HashMap<char, SpeciesId>,
}

impl SpeciesDatabase {
    /// Ids are assigned in input order. Later entries win on a name or marker clash;
    /// the compiler rejects clashes before getting here.
    pub fn from_defs(mut defs: Vec<SpeciesDef>) -> Self {
        let mut ids_by_name = HashMap::with_capacity(defs.len());
        let mut ids_by_marker = HashMap::with_capacity(defs.len());
        for (idx, def) in defs.iter_mut().enumerate() {
            let id = SpeciesId(idx as u32);
            def.id = id;
            ids_by_name.insert(def.def_name.clone(), id);
            ids_by_marker.insert(def.marker, id);
        }
        Self {
            defs,
            ids_by_name,
            ids_by_marker,
        }
    }

    pub fn species(&self, id: SpeciesId) -> Option<&SpeciesDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&SpeciesDef> {
        self.ids_by_name
            .get(name)
            .and_then(|id| self.species(*id))
    }

    pub fn by_marker(&self, marker: char) -> Option<&SpeciesDef> {
        self.ids_by_marker
            .get(&marker)
            .and_then(|id| self.species(*id))
    }

    pub fn defs(&self) -> &[SpeciesDef] {
        &self.defs
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, marker: char) -> SpeciesDef {
        SpeciesDef {
            id: SpeciesId(99),
            def_name: name.to_string(),
            label: name.to_string(),
            marker,
            max_hit_points: 3,
            strength: 5,
            dexterity: 0,
            vitality: 0,
            move_speed: 84.0,
            bounds_width: 22.0,
            bounds_height: 40.0,
        }
    }

    #[test]
    fn ids_follow_input_order() {
        let database = SpeciesDatabase::from_defs(vec![def("EnemyA", 'A'), def("EnemyB", 'B')]);
        assert_eq!(database.len(), 2);
        assert_eq!(database.by_name("EnemyB").map(|d| d.id), Some(SpeciesId(1)));
        assert_eq!(database.by_marker('A').map(|d| d.id), Some(SpeciesId(0)));
        assert!(database.by_name("EnemyZ").is_none());
    }
}
