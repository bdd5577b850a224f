use std::f64::consts;

use rand::Rng;

use super::{expects, float::unary, ModuleBuilder};
use crate::{table::TableRef, value::Value};

pub(super) fn build() -> TableRef {
    ModuleBuilder::new()
        .function("sin", unary("math.sin", f64::sin))
        .function("cos", unary("math.cos", f64::cos))
        .function("tan", unary("math.tan", f64::tan))
        .function("exp", unary("math.exp", f64::exp))
        .function("log", unary("math.log", f64::ln))
        .function("random", |args| {
            if !args.is_empty() {
                return Err(expects("math.random", ""));
            }
            Ok(Value::Float(rand::thread_rng().gen::<f64>()))
        })
        .value("pi", Value::Float(consts::PI))
        .value("e", Value::Float(consts::E))
        .finish()
}
