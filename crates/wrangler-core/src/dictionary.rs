//! Diccionario en memoria: clave natural -> id sustituto.
//!
//! El diccionario nunca asigna ids. La autoridad es el `Sink`; el diccionario
//! es una caché de lo que el sink ya tiene:
//! - `preload` lo siembra desde el sink al arrancar.
//! - `stage` registra un id que el sink devolvió dentro de la unidad de
//!   trabajo en curso.
//! - `commit_staged` / `discard_staged` siguen el resultado de esa unidad de
//!   trabajo: un insert revertido nunca queda visible en la caché.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::errors::DictionaryError;
use crate::model::DictId;

#[derive(Debug, Clone)]
pub struct Dictionary<K> {
    committed: IndexMap<K, DictId>,
    staged: IndexMap<K, DictId>,
    // ids de entradas confirmadas y pendientes
    ids: HashSet<DictId>,
}

impl<K: Eq + Hash + Clone> Dictionary<K> {
    pub fn new() -> Self {
        Self {
            committed: IndexMap::new(),
            staged: IndexMap::new(),
            ids: HashSet::new(),
        }
    }

    /// Siembra el diccionario con entradas leídas de un sink y devuelve
    /// cuántas agregó. Claves o ids duplicados indican que sink y caché no
    /// coinciden, y se rechazan.
    pub fn preload<I>(&mut self, entries: I) -> Result<usize, DictionaryError>
    where
        I: IntoIterator<Item = (K, DictId)>,
    {
        let mut added = 0;
        for (key, id) in entries {
            self.check_free(&key, id)?;
            self.ids.insert(id);
            self.committed.insert(key, id);
            added += 1;
        }
        Ok(added)
    }

    /// Id de `key` si se conoce (confirmado o pendiente). Sin efectos.
    pub fn resolve(&self, key: &K) -> Option<DictId> {
        self.committed
            .get(key)
            .or_else(|| self.staged.get(key))
            .copied()
    }

    /// Registra el id que el sink acaba de devolver para una clave nueva.
    pub fn stage(&mut self, key: K, id: DictId) -> Result<(), DictionaryError> {
        self.check_free(&key, id)?;
        self.ids.insert(id);
        self.staged.insert(key, id);
        Ok(())
    }

    /// Promueve las entradas pendientes una vez que el sink las confirmó.
    pub fn commit_staged(&mut self) -> usize {
        let staged = std::mem::take(&mut self.staged);
        let n = staged.len();
        self.committed.extend(staged);
        n
    }

    /// Descarta las entradas pendientes tras un rollback del sink.
    pub fn discard_staged(&mut self) -> usize {
        let n = self.staged.len();
        for (_, id) in self.staged.drain(..) {
            self.ids.remove(&id);
        }
        n
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Entradas confirmadas, en el orden en que se conocieron.
    pub fn iter(&self) -> impl Iterator<Item = (&K, DictId)> + '_ {
        self.committed.iter().map(|(k, id)| (k, *id))
    }

    fn check_free(&self, key: &K, id: DictId) -> Result<(), DictionaryError> {
        if let Some(existing) = self.resolve(key) {
            return Err(DictionaryError::DuplicateKey { existing, id });
        }
        if self.ids.contains(&id) {
            return Err(DictionaryError::DuplicateId(id));
        }
        Ok(())
    }
}

impl<K: Eq + Hash + Clone> Default for Dictionary<K> {
    fn default() -> Self {
        Self::new()
    }
}
