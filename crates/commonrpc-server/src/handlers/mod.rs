//! Namespaces served by the binary.
//!
//! Every namespace is registered up front and exposed through an allow-list,
//! so a call can only ever reach the names listed in [`EXPOSED`].

mod math;
mod system;
mod text;

use commonrpc::{AllowList, Dispatcher, NamespaceRegistry};

/// Namespace names reachable from the wire.
pub const EXPOSED: [&str; 3] = [math::NAME, text::NAME, system::NAME];

pub fn registry() -> NamespaceRegistry {
    NamespaceRegistry::new()
        .register(math::namespace())
        .register(text::namespace())
        .register(system::namespace())
}

pub fn dispatcher() -> Dispatcher {
    Dispatcher::new(AllowList::new(registry(), EXPOSED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonrpc::envelope::{decode_result, encode_call};
    use commonrpc::TransportRequest;
    use serde_json::{json, Map};

    #[test]
    fn test_every_exposed_namespace_is_registered() {
        let registry = registry();
        let mut names: Vec<_> = registry.names().collect();
        names.sort();

        let mut exposed = EXPOSED.to_vec();
        exposed.sort();
        assert_eq!(names, exposed);
    }

    #[test]
    fn test_dispatcher_hides_unlisted_namespaces() {
        let payload = encode_call("os", "getcwd", &[], &Map::new()).unwrap();
        let response = dispatcher().handle(&TransportRequest::new(payload, "t"));
        let envelope = decode_result(&response.payload).unwrap();
        assert_eq!(envelope.exc_type, "ModuleNotFoundError");
    }

    #[test]
    fn test_dispatcher_reaches_nested_method() {
        let payload = encode_call("math_ns", "Stats.mean", &[json!([1, 2, 3])], &Map::new()).unwrap();
        let response = dispatcher().handle(&TransportRequest::new(payload, "t"));
        let envelope = decode_result(&response.payload).unwrap();
        assert_eq!(envelope.result, Some(json!(2.0)));
    }
}
