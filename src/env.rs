//! Scope storage for the evaluator.
//!
//! Scopes live in a [`Heap`] and refer to their parent and to each other
//! (through closures) by [`EnvId`]. Closures stored in the scope they capture
//! form cycles, so scopes are reclaimed by a mark-and-sweep pass rather than
//! by reference counting. Marking starts from the rooted [`Env`] handles held
//! by the host plus any values the caller asks to keep.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::object::Object;
use crate::stack::ensure_sufficient_stack;

/// Generation-checked index of a scope in a [`Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId {
  index: u32,
  generation: u32,
}

/// A top-level environment owned by the host.
///
/// The scope stays alive for as long as any clone of the handle exists. A
/// handle is only meaningful to the evaluator that created it.
#[derive(Debug, Clone)]
pub struct Env {
  id: EnvId,
  _root: Rc<()>,
}

impl Env {
  pub fn id(&self) -> EnvId {
    self.id
  }
}

#[derive(Debug, Default)]
struct Scope {
  objects: HashMap<String, Object>,
  parent: Option<EnvId>,
  captured: bool,
}

#[derive(Debug)]
struct Slot {
  generation: u32,
  marked: bool,
  scope: Option<Scope>,
}

#[derive(Debug, Default)]
pub struct Heap {
  slots: Vec<Slot>,
  free: Vec<u32>,
  roots: Vec<(Rc<()>, EnvId)>,
  live: usize,
}

impl Heap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Allocates a parentless scope rooted by the returned handle.
  pub fn root(&mut self) -> Env {
    let id = self.alloc(None);
    let root = Rc::new(());
    self.roots.push((Rc::clone(&root), id));
    Env { id, _root: root }
  }

  pub fn alloc(&mut self, parent: Option<EnvId>) -> EnvId {
    let scope = Scope {
      objects: HashMap::new(),
      parent,
      captured: false,
    };
    self.live += 1;

    if let Some(index) = self.free.pop() {
      let slot = &mut self.slots[index as usize];
      slot.scope = Some(scope);
      return EnvId {
        index,
        generation: slot.generation,
      };
    }

    self.slots.push(Slot {
      generation: 0,
      marked: false,
      scope: Some(scope),
    });
    EnvId {
      index: (self.slots.len() - 1) as u32,
      generation: 0,
    }
  }

  fn scope(&self, id: EnvId) -> Option<&Scope> {
    self
      .slots
      .get(id.index as usize)
      .filter(|slot| slot.generation == id.generation)
      .and_then(|slot| slot.scope.as_ref())
  }

  fn scope_mut(&mut self, id: EnvId) -> Option<&mut Scope> {
    self
      .slots
      .get_mut(id.index as usize)
      .filter(|slot| slot.generation == id.generation)
      .and_then(|slot| slot.scope.as_mut())
  }

  pub fn contains(&self, id: EnvId) -> bool {
    self.scope(id).is_some()
  }

  /// Looks `name` up in `id` and then outward through its parents.
  pub fn get(&self, id: EnvId, name: &str) -> Option<Object> {
    let mut current = Some(id);

    while let Some(id) = current {
      let scope = self.scope(id)?;
      if let Some(object) = scope.objects.get(name) {
        return Some(object.clone());
      }
      current = scope.parent;
    }

    None
  }

  /// Binds `name` in `id` itself, shadowing any outer binding. Returns
  /// `false` if the scope has been reclaimed.
  pub fn set(&mut self, id: EnvId, name: String, value: Object) -> bool {
    match self.scope_mut(id) {
      Some(scope) => {
        scope.objects.insert(name, value);
        true
      }
      None => false,
    }
  }

  /// Marks `id` as referenced by a closure, so [`Heap::release`] leaves it
  /// to the collector.
  pub fn capture(&mut self, id: EnvId) {
    if let Some(scope) = self.scope_mut(id) {
      scope.captured = true;
    }
  }

  /// Frees a finished call frame right away unless a closure captured it.
  ///
  /// A scope only becomes a parent or a closure environment by having a
  /// function created in it, so an uncaptured frame has no referrers left
  /// once its body returns.
  pub fn release(&mut self, id: EnvId) -> bool {
    match self.scope(id) {
      Some(scope) if !scope.captured => {
        self.free_slot(id.index);
        self.live -= 1;
        true
      }
      _ => false,
    }
  }

  fn free_slot(&mut self, index: u32) {
    let slot = &mut self.slots[index as usize];
    slot.scope = None;
    slot.generation = slot.generation.wrapping_add(1);
    self.free.push(index);
  }

  /// Number of scopes currently allocated.
  pub fn len(&self) -> usize {
    self.live
  }

  pub fn is_empty(&self) -> bool {
    self.live == 0
  }

  /// Frees every scope not reachable from a live root or from `keep`.
  /// Returns the number of scopes freed.
  pub fn collect<'a>(&mut self, keep: impl IntoIterator<Item = &'a Object>) -> usize {
    self.roots.retain(|(root, _)| Rc::strong_count(root) > 1);

    for slot in &mut self.slots {
      slot.marked = false;
    }

    let mut pending: Vec<EnvId> = self.roots.iter().map(|(_, id)| *id).collect();
    for object in keep {
      trace_object(object, &mut pending);
    }

    while let Some(id) = pending.pop() {
      let Some(slot) = self
        .slots
        .get_mut(id.index as usize)
        .filter(|slot| slot.generation == id.generation && !slot.marked)
      else {
        continue;
      };

      slot.marked = true;
      if let Some(scope) = &slot.scope {
        pending.extend(scope.parent);
        for object in scope.objects.values() {
          trace_object(object, &mut pending);
        }
      }
    }

    let unmarked: Vec<u32> = self
      .slots
      .iter()
      .enumerate()
      .filter(|(_, slot)| slot.scope.is_some() && !slot.marked)
      .map(|(index, _)| index as u32)
      .collect();

    let freed = unmarked.len();
    for index in unmarked {
      self.free_slot(index);
    }
    self.live -= freed;

    debug!(freed, live = self.live, "collected scopes");
    freed
  }
}

fn trace_object(object: &Object, pending: &mut Vec<EnvId>) {
  match object {
    Object::Function(function) => pending.push(function.env),
    Object::Array(elements) => ensure_sufficient_stack(|| {
      for element in elements.iter() {
        trace_object(element, pending);
      }
    }),
    Object::Hash(pairs) => ensure_sufficient_stack(|| {
      for value in pairs.values() {
        trace_object(value, pending);
      }
    }),
    Object::Return(value) => trace_object(value, pending),
    _ => {}
  }
}
