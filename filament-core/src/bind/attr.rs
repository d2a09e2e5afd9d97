//! Attribute, property, boolean-attribute and event slots.

use std::rc::Rc;

use crate::dom::Node;
use crate::error::{self, EngineError};
use crate::result::Teardown;
use crate::value::{Primitive, Value};

/// Apply `value` once, or on every emission when it is reactive.
fn bind_primitive<F>(slot: &'static str, name: &str, value: &Value, teardown: &Teardown, apply: F)
where
    F: Fn(&Primitive) + 'static,
{
    match value {
        Value::Primitive(primitive) => apply(primitive),
        Value::Reactive(source) => {
            let name = name.to_string();
            let subscription = source.subscribe(Rc::new(move |emitted: &Value| match emitted {
                Value::Primitive(primitive) => apply(primitive),
                other => tracing::warn!(
                    slot,
                    name = %name,
                    kind = other.kind_name(),
                    "non-primitive emission ignored"
                ),
            }));
            teardown.add_subscription(subscription);
        }
        other => tracing::warn!(
            slot,
            name,
            kind = other.kind_name(),
            "value kind cannot bind here; slot skipped"
        ),
    }
}

pub(crate) fn bind_attribute(element: &Node, name: &str, value: &Value, teardown: &Teardown) {
    let target = element.clone();
    let attribute = name.to_string();
    bind_primitive("attribute", name, value, teardown, move |primitive| {
        match primitive.to_attribute() {
            Some(text) => target.set_attribute(attribute.as_str(), text),
            None => {
                target.remove_attribute(&attribute);
            }
        }
    });
}

pub(crate) fn bind_property(element: &Node, name: &str, value: &Value, teardown: &Teardown) {
    let target = element.clone();
    let property = name.to_string();
    bind_primitive("property", name, value, teardown, move |primitive| {
        target.set_property(property.as_str(), primitive.clone());
    });
}

pub(crate) fn bind_boolean(element: &Node, name: &str, value: &Value, teardown: &Teardown) {
    let target = element.clone();
    let attribute = name.to_string();
    bind_primitive("boolean-attribute", name, value, teardown, move |primitive| {
        if primitive.is_truthy() {
            target.set_attribute(attribute.as_str(), "");
        } else {
            target.remove_attribute(&attribute);
        }
    });
}

pub(crate) fn bind_event(element: &Node, name: &str, value: &Value, teardown: &Teardown) {
    let handler = match value {
        Value::Handler(handler) => handler.clone(),
        Value::Primitive(Primitive::Null) => {
            tracing::debug!(event = name, "null event handler; nothing attached");
            return;
        }
        other => {
            tracing::warn!(
                event = name,
                kind = other.kind_name(),
                "event binding needs a handler; slot skipped"
            );
            return;
        }
    };

    let event_name = name.to_string();
    let id = element.add_event_listener(name, move |event| {
        error::guard(
            || handler.call(event),
            |message| EngineError::HandlerPanicked {
                event: event_name.clone(),
                message,
            },
        );
    });
    let target = element.clone();
    teardown.add(move || {
        target.remove_event_listener(id);
    });
}

// ---- Tests ----
