// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Callback registry.
//
// The host only understands flat string parameters, so a completion handler
// crosses the boundary as an opaque token and comes back later as a method
// name or through `gbCallback(token, values)`. The registry owns the actual
// closures keyed by a random id; a token can only ever resolve to something
// this registry was given. Nothing is reconstructed from the token text.

use std::collections::{HashMap, HashSet};

use gbkit_core::{BridgeError, CallbackToken, Result};
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

/// A registered callback. Receives the host's argument list in order.
pub type CallbackFn = Box<dyn FnMut(&[Value]) -> Result<()>>;

struct Entry {
    /// `None` while the callback is checked out and running.
    callback: Option<CallbackFn>,
    /// The other half of a success/error pair.
    partner: Option<Uuid>,
    /// Retired after its first delivery.
    once: bool,
}

/// A callback taken out of the registry for the duration of one invocation.
pub struct Checkout {
    id: Uuid,
    token: String,
    callback: CallbackFn,
    persistent: bool,
}

impl Checkout {
    /// Run the callback. Errors it raises are returned unchanged.
    pub fn call(&mut self, args: &[Value]) -> Result<()> {
        trace!(token = %self.token, args = args.len(), "invoking callback");
        (self.callback)(args)
    }
}

/// Owned mapping from callback tokens to closures.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: HashMap<Uuid, Entry>,
    /// Paired completions that have already fired.
    delivered: HashSet<Uuid>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback that stays invokable until released.
    pub fn encode<F>(&mut self, callback: F) -> CallbackToken
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.register(Box::new(callback), false)
    }

    /// Register a callback for a single answer. Later deliveries fail with
    /// [`BridgeError::CompletionAlreadyDelivered`].
    pub fn encode_once<F>(&mut self, callback: F) -> CallbackToken
    where
        F: FnMut(&[Value]) -> Result<()> + 'static,
    {
        self.register(Box::new(callback), true)
    }

    fn register(&mut self, callback: CallbackFn, once: bool) -> CallbackToken {
        let (id, token) = CallbackToken::generate();
        self.entries.insert(
            id,
            Entry {
                callback: Some(callback),
                partner: None,
                once,
            },
        );
        debug!(%token, once, "callback registered");
        token
    }

    /// Register mutually exclusive success/error completions.
    ///
    /// Whichever fires first retires both; later deliveries to either token
    /// fail with [`BridgeError::CompletionAlreadyDelivered`].
    pub fn encode_pair<S, E>(&mut self, success: S, error: E) -> (CallbackToken, CallbackToken)
    where
        S: FnMut(&[Value]) -> Result<()> + 'static,
        E: FnMut(&[Value]) -> Result<()> + 'static,
    {
        let (success_id, success_token) = CallbackToken::generate();
        let (error_id, error_token) = CallbackToken::generate();
        self.entries.insert(
            success_id,
            Entry {
                callback: Some(Box::new(success)),
                partner: Some(error_id),
                once: true,
            },
        );
        self.entries.insert(
            error_id,
            Entry {
                callback: Some(Box::new(error)),
                partner: Some(success_id),
                once: true,
            },
        );
        debug!(success = %success_token, error = %error_token, "completion pair registered");
        (success_token, error_token)
    }

    /// Resolve a token to its registered id.
    pub fn decode(&self, token: &str) -> Result<Uuid> {
        let id = CallbackToken::parse(token)?;
        if self.entries.contains_key(&id) {
            Ok(id)
        } else if self.delivered.contains(&id) {
            Err(BridgeError::CompletionAlreadyDelivered(token.to_string()))
        } else {
            Err(BridgeError::Decode(format!("`{token}` is not registered")))
        }
    }

    /// Whether `token` currently resolves to a callback.
    pub fn contains(&self, token: &str) -> bool {
        self.decode(token).is_ok()
    }

    /// Take the callback out so it can run without the registry borrowed.
    ///
    /// Persistent callbacks must be handed back with [`check_in`](Self::check_in).
    /// One-shot callbacks and paired completions (with their partner) are
    /// retired here.
    pub fn check_out(&mut self, token: &str) -> Result<Checkout> {
        let id = self.decode(token)?;
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| BridgeError::Decode(format!("`{token}` is not registered")))?;
        let callback = entry
            .callback
            .take()
            .ok_or_else(|| BridgeError::Callback(format!("`{token}` invoked from inside itself")))?;
        let partner = entry.partner;
        let once = entry.once;

        let persistent = match partner {
            None if !once => true,
            None => {
                self.entries.remove(&id);
                self.delivered.insert(id);
                false
            }
            Some(partner) => {
                self.entries.remove(&id);
                self.entries.remove(&partner);
                self.delivered.insert(id);
                self.delivered.insert(partner);
                false
            }
        };

        Ok(Checkout {
            id,
            token: token.to_string(),
            callback,
            persistent,
        })
    }

    /// Return a persistent callback after it ran. Released meanwhile means dropped.
    pub fn check_in(&mut self, checkout: Checkout) {
        if !checkout.persistent {
            return;
        }
        if let Some(entry) = self.entries.get_mut(&checkout.id) {
            entry.callback = Some(checkout.callback);
        }
    }

    /// Decode and call in one step. The callback must not touch this registry.
    pub fn invoke(&mut self, token: &str, args: &[Value]) -> Result<()> {
        let mut checkout = self.check_out(token)?;
        let result = checkout.call(args);
        self.check_in(checkout);
        result
    }

    /// Drop a registration. Releasing one half of a pair releases both.
    pub fn release(&mut self, token: &str) -> bool {
        let Ok(id) = CallbackToken::parse(token) else {
            return false;
        };
        match self.entries.remove(&id) {
            Some(entry) => {
                if let Some(partner) = entry.partner {
                    self.entries.remove(&partner);
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.delivered.clear();
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("registered", &self.entries.len())
            .field("delivered", &self.delivered.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<Vec<Value>>>>, impl FnMut(&[Value]) -> Result<()>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |args: &[Value]| {
            sink.borrow_mut().push(args.to_vec());
            Ok(())
        })
    }

    #[test]
    fn decoded_callback_behaves_like_the_original() {
        let mut registry = CallbackRegistry::new();
        let (seen, callback) = recorder();
        let token = registry.encode(callback);

        registry.invoke(token.as_str(), &[json!(1), json!("two")]).expect("invoke");
        registry.invoke(token.as_str(), &[]).expect("invoke again");

        assert_eq!(*seen.borrow(), vec![vec![json!(1), json!("two")], vec![]]);
    }

    #[test]
    fn foreign_tokens_never_decode() {
        let mut registry = CallbackRegistry::new();
        registry.encode(|_: &[Value]| Ok(()));

        // A base64 function source, as older pages produced.
        let legacy = "ZnVuY3Rpb24oKXsgYWxlcnQoMSkgfQ==";
        assert!(matches!(registry.decode(legacy), Err(BridgeError::Decode(_))));
        assert!(matches!(registry.invoke("", &[]), Err(BridgeError::Decode(_))));

        let (_, unissued) = CallbackToken::generate();
        assert!(matches!(
            registry.invoke(unissued.as_str(), &[]),
            Err(BridgeError::Decode(_))
        ));
    }

    #[test]
    fn callback_errors_propagate() {
        let mut registry = CallbackRegistry::new();
        let token = registry.encode(|_: &[Value]| Err(BridgeError::Callback("boom".into())));
        let err = registry.invoke(token.as_str(), &[]).expect_err("should fail");
        assert!(matches!(err, BridgeError::Callback(ref m) if m == "boom"));
        // Still registered after failing.
        assert!(registry.contains(token.as_str()));
    }

    #[test]
    fn paired_completions_fire_once() {
        let mut registry = CallbackRegistry::new();
        let (successes, success) = recorder();
        let (errors, error) = recorder();
        let (ok, fail) = registry.encode_pair(success, error);

        registry.invoke(fail.as_str(), &[json!({"code": 1})]).expect("error path");
        assert!(matches!(
            registry.invoke(ok.as_str(), &[]),
            Err(BridgeError::CompletionAlreadyDelivered(_))
        ));
        assert!(matches!(
            registry.invoke(fail.as_str(), &[]),
            Err(BridgeError::CompletionAlreadyDelivered(_))
        ));
        assert!(successes.borrow().is_empty());
        assert_eq!(errors.borrow().len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn one_shot_callbacks_retire_after_delivery() {
        let mut registry = CallbackRegistry::new();
        let (seen, callback) = recorder();
        let token = registry.encode_once(callback);
        assert_eq!(registry.len(), 1);

        registry.invoke(token.as_str(), &[Value::Null]).expect("first answer");
        assert!(registry.is_empty());
        assert!(matches!(
            registry.invoke(token.as_str(), &[]),
            Err(BridgeError::CompletionAlreadyDelivered(_))
        ));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn release_drops_both_halves_of_a_pair() {
        let mut registry = CallbackRegistry::new();
        let (ok, fail) = registry.encode_pair(|_: &[Value]| Ok(()), |_: &[Value]| Ok(()));
        assert_eq!(registry.len(), 2);
        assert!(registry.release(ok.as_str()));
        assert!(!registry.contains(fail.as_str()));
        assert!(!registry.release("not-a-token"));
    }

    #[test]
    fn checked_out_callback_cannot_run_twice_at_once() {
        let mut registry = CallbackRegistry::new();
        let token = registry.encode(|_: &[Value]| Ok(()));
        let checkout = registry.check_out(token.as_str()).expect("first");
        assert!(matches!(
            registry.check_out(token.as_str()),
            Err(BridgeError::Callback(_))
        ));
        registry.check_in(checkout);
        assert!(registry.check_out(token.as_str()).is_ok());
    }
}
