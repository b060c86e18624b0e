use memstore::Store;

use crate::battle::{state::Battle, BattleId};

/// Keeps battles between commands.
pub trait BattleRepository {
    fn get_by_id(&self, id: BattleId) -> Option<&Battle>;
    fn get_by_id_mut(&mut self, id: BattleId) -> Option<&mut Battle>;

    /// Inserts or replaces the battle stored under its own id.
    fn save(&mut self, battle: Battle);

    fn delete(&mut self, id: BattleId) -> Option<Battle>;
    fn list(&self) -> Vec<BattleId>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryBattleRepository {
    store: Store<BattleId, Battle>,
}

impl InMemoryBattleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BattleRepository for InMemoryBattleRepository {
    fn get_by_id(&self, id: BattleId) -> Option<&Battle> {
        self.store.get_opt(id)
    }

    fn get_by_id_mut(&mut self, id: BattleId) -> Option<&mut Battle> {
        self.store.get_opt_mut(id)
    }

    fn save(&mut self, battle: Battle) {
        self.store.save(battle.id(), battle);
    }

    fn delete(&mut self, id: BattleId) -> Option<Battle> {
        self.store.delete(id)
    }

    fn list(&self) -> Vec<BattleId> {
        self.store.ids().collect()
    }
}
