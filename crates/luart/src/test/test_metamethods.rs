// Metamethod dispatch scenarios: a complex-number-style table type whose
// arithmetic is supplied by handlers in a shared metatable.
use std::rc::Rc;

use crate::lua_value::{LuaTable, LuaValue, TableRef, metamethod};
use crate::lua_vm::{Closure, NativeClosure};

fn complex_metatable() -> TableRef {
    let add = |_: &NativeClosure, args: &[LuaValue]| -> LuaValue {
        let result = LuaTable::create(2, 0);
        {
            let a = args[0].as_table().unwrap().borrow();
            let b = args[1].as_table().unwrap().borrow();
            let mut r = result.borrow_mut();
            r.set_int(1, metamethod::add(&a.get_int(1), &b.get_int(1)));
            r.set_int(2, metamethod::add(&a.get_int(2), &b.get_int(2)));
        }
        LuaValue::Table(result)
    };
    let mt = LuaTable::create(0, 0);
    mt.borrow_mut().set_str(
        metamethod::MM_ADD,
        LuaValue::Function(Rc::new(Closure::Native(NativeClosure::new(
            add,
            Vec::new(),
        )))),
    );
    mt
}

fn complex(re: f64, im: f64, mt: &TableRef) -> LuaValue {
    let t = LuaTable::create(2, 0);
    {
        let mut t = t.borrow_mut();
        t.set_int(1, LuaValue::float(re));
        t.set_int(2, LuaValue::float(im));
        t.set_metatable(Some(mt.clone()));
    }
    LuaValue::Table(t)
}

#[test]
fn test_componentwise_add_through_handler() {
    let mt = complex_metatable();
    let a = complex(1.0, 2.0, &mt);
    let b = complex(10.0, 20.0, &mt);
    let sum = metamethod::add(&a, &b);
    let sum = sum.as_table().unwrap().borrow();
    assert_eq!(sum.get_int(1), LuaValue::Float(11.0));
    assert_eq!(sum.get_int(2), LuaValue::Float(22.0));
}

#[test]
fn test_handler_found_on_second_operand() {
    let mt = complex_metatable();
    let b = complex(3.0, 4.0, &mt);
    // First operand is a bare table with no metatable
    let a_raw = LuaValue::new_table(2, 0);
    {
        let t = a_raw.as_table().unwrap();
        let mut t = t.borrow_mut();
        t.set_int(1, LuaValue::float(1.0));
        t.set_int(2, LuaValue::float(1.0));
    }
    let sum = metamethod::add(&a_raw, &b);
    let sum = sum.as_table().unwrap().borrow();
    assert_eq!(sum.get_int(1), LuaValue::Float(4.0));
}

#[test]
fn test_each_operator_uses_its_own_event() {
    let record = LuaTable::create(0, 0);
    let make = |name: &'static str| {
        LuaValue::Function(Rc::new(Closure::Native(NativeClosure::new(
            |closure, _| closure.upvalue(0),
            vec![LuaValue::string(name)],
        ))))
    };
    {
        let mut mt = record.borrow_mut();
        mt.set_str(metamethod::MM_ADD, make("plus"));
        mt.set_str(metamethod::MM_SUB, make("minus"));
        mt.set_str(metamethod::MM_MUL, make("times"));
        mt.set_str(metamethod::MM_DIV, make("over"));
    }
    let t = LuaValue::new_table(0, 0);
    t.as_table()
        .unwrap()
        .borrow_mut()
        .set_metatable(Some(record));
    let one = LuaValue::integer(1);

    assert_eq!(metamethod::add(&t, &one), LuaValue::string("plus"));
    assert_eq!(metamethod::sub(&t, &one), LuaValue::string("minus"));
    assert_eq!(metamethod::mul(&t, &one), LuaValue::string("times"));
    assert_eq!(metamethod::div(&t, &one), LuaValue::string("over"));
}

#[test]
fn test_no_handler_falls_back_per_policy() {
    let t = LuaValue::new_table(0, 0);
    let two = LuaValue::integer(2);
    // Permissive: the table coerces to zero
    assert_eq!(metamethod::mul(&t, &two), LuaValue::Float(0.0));
    // Strict: recoverable type error
    assert!(metamethod::try_mul(&t, &two).is_err());
}

#[test]
fn test_metatable_is_not_consulted_recursively() {
    // Handler lookup is raw: a metatable whose own metatable defines __add
    // must not be found through it
    let grandparent = LuaTable::create(0, 0);
    grandparent.borrow_mut().set_str(
        metamethod::MM_ADD,
        LuaValue::Function(Rc::new(Closure::Native(NativeClosure::new(
            |_, _| LuaValue::string("inherited"),
            Vec::new(),
        )))),
    );
    let parent = LuaTable::create(0, 0);
    parent.borrow_mut().set_metatable(Some(grandparent));
    let t = LuaValue::new_table(0, 0);
    t.as_table().unwrap().borrow_mut().set_metatable(Some(parent));

    assert_eq!(
        metamethod::add(&t, &LuaValue::integer(1)),
        LuaValue::Float(1.0)
    );
}
