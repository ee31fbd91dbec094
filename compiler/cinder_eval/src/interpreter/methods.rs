//! Builtin member functions of arrays, dictionaries, strings and the other
//! builtin kinds, plus `getType()` and `isInstance(_:)` on every value.
//!
//! Elements that leave a container go through [`Interpreter::release`]:
//! resources are moved out with a fresh identity, everything else is copied
//! and the stored original is discarded. Elements that enter a container are
//! adopted by the container's owner.

use cinder_ir::{Address, LocationRange, Name, StaticType};

use super::declarations::{box_to, expect_bool, expect_integer, expect_type, take_arguments};
use super::expressions::hash_key;
use super::Interpreter;
use crate::errors::{
    array_index_out_of_bounds, array_slice_indices, invalid_slice_index, missing_member,
    resource_copy, type_mismatch, EvalResult,
};
use crate::value::{
    ArrayValue, Container, DictionaryValue, FunctionValue, IntegerValue, StringValue, Value,
};

const EVERY_VALUE: &[&str] = &["getType", "isInstance"];
const ARRAY: &[&str] = &[
    "append",
    "appendAll",
    "insert",
    "remove",
    "removeFirst",
    "removeLast",
    "contains",
    "firstIndex",
    "concat",
    "slice",
    "reverse",
    "map",
    "filter",
];
const DICTIONARY: &[&str] = &["containsKey", "insert", "remove", "forEachKey"];
const STRING: &[&str] = &["concat", "slice", "contains", "toLower", "split", "replaceAll"];
const NUMBER: &[&str] = &["toString", "toBigEndianBytes"];
const ADDRESS: &[&str] = &["toString", "toBytes"];
const TO_STRING: &[&str] = &["toString"];
const TYPE: &[&str] = &["isSubtype"];

fn builtin_names(value: &Value) -> &'static [&'static str] {
    match value {
        Value::Array(_) => ARRAY,
        Value::Dictionary(_) => DICTIONARY,
        Value::String(_) => STRING,
        Value::Character(_) | Value::Path(_) => TO_STRING,
        Value::Integer(_) | Value::FixedPoint(_) => NUMBER,
        Value::Address(_) => ADDRESS,
        Value::Type(_) => TYPE,
        _ => &[],
    }
}

impl Interpreter {
    pub(crate) fn has_builtin(&self, value: &Value, name: Name) -> bool {
        let name = self.name_str(name);
        EVERY_VALUE.contains(&name) || builtin_names(value).contains(&name)
    }

    /// Invoke builtin `method` of `receiver`.
    pub(crate) fn call_builtin(
        &mut self,
        receiver: &Value,
        method: Name,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        let method = self.name_str(method);
        match (receiver, method) {
            (_, "getType") => {
                let [] = take_arguments(arguments)?;
                Ok(Value::Type(receiver.static_type()))
            }
            (_, "isInstance") => {
                let [ty] = take_arguments(arguments)?;
                let ty = expect_type(&ty)?;
                Ok(Value::Bool(self.is_subtype(&receiver.static_type(), &ty)))
            }
            (Value::Array(array), _) => self.array_method(array, method, arguments, site),
            (Value::Dictionary(dictionary), _) => {
                self.dictionary_method(dictionary, method, arguments, site)
            }
            (Value::String(string), "split") => {
                let [separator] = take_arguments(arguments)?;
                let parts = string
                    .split(&expect_string(&separator)?)
                    .into_iter()
                    .map(Value::String)
                    .collect();
                Ok(self.new_array(StaticType::array(StaticType::String), parts, None))
            }
            (Value::String(string), _) => string_method(string, method, arguments),
            (Value::Character(character), "toString") => {
                let [] = take_arguments(arguments)?;
                Ok(Value::String(character.clone()))
            }
            (Value::Integer(integer), "toString") => {
                let [] = take_arguments(arguments)?;
                Ok(Value::string(&integer.to_string()))
            }
            (Value::FixedPoint(fixed), "toString") => {
                let [] = take_arguments(arguments)?;
                Ok(Value::string(&fixed.to_string()))
            }
            (Value::Integer(integer), "toBigEndianBytes") => {
                let [] = take_arguments(arguments)?;
                Ok(self.bytes(&integer.to_big_endian_bytes()))
            }
            (Value::FixedPoint(fixed), "toBigEndianBytes") => {
                let [] = take_arguments(arguments)?;
                Ok(self.bytes(&fixed.to_big_endian_bytes()))
            }
            (Value::Address(address), "toString") => {
                let [] = take_arguments(arguments)?;
                Ok(Value::string(&address.to_string()))
            }
            (Value::Address(address), "toBytes") => {
                let [] = take_arguments(arguments)?;
                Ok(self.bytes(&address.to_bytes()))
            }
            (Value::Path(_), "toString") => {
                let [] = take_arguments(arguments)?;
                Ok(Value::string(&self.render(receiver)))
            }
            (Value::Type(ty), "isSubtype") => {
                let [of] = take_arguments(arguments)?;
                let of = expect_type(&of)?;
                Ok(Value::Bool(self.is_subtype(ty, &of)))
            }
            _ => Err(missing_member(method, receiver.type_name())),
        }
    }

    fn array_method(
        &mut self,
        array: &ArrayValue,
        method: &str,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        let owner = array.borrow().header.owner;
        let element_type = array.element_type();
        match method {
            "append" => {
                let [element] = take_arguments(arguments)?;
                let element = self.adopt_element(array, element, owner, &element_type)?;
                array.borrow_mut().elements.push(element);
                Ok(Value::Void)
            }
            "appendAll" => {
                let [other] = take_arguments(arguments)?;
                let Value::Array(other) = other else {
                    return Err(type_mismatch("array", other.type_name()));
                };
                for element in other.elements() {
                    let element = self.adopt_element(array, element, owner, &element_type)?;
                    array.borrow_mut().elements.push(element);
                }
                Ok(Value::Void)
            }
            "insert" => {
                let [at, element] = take_arguments(arguments)?;
                let at = expect_integer(&at)?.to_i128_saturating();
                let length = array.len();
                let position = usize::try_from(at)
                    .ok()
                    .filter(|position| *position <= length)
                    .ok_or_else(|| array_index_out_of_bounds(at, length))?;
                let element = self.adopt_element(array, element, owner, &element_type)?;
                array.borrow_mut().elements.insert(position, element);
                Ok(Value::Void)
            }
            "remove" => {
                let [at] = take_arguments(arguments)?;
                let at = expect_integer(&at)?.to_i128_saturating();
                let length = array.len();
                let position = usize::try_from(at)
                    .ok()
                    .filter(|position| *position < length)
                    .ok_or_else(|| array_index_out_of_bounds(at, length))?;
                let removed = array.borrow_mut().elements.remove(position);
                self.release(removed)
            }
            "removeFirst" => {
                let [] = take_arguments(arguments)?;
                if array.is_empty() {
                    return Err(array_index_out_of_bounds(0, 0));
                }
                let removed = array.borrow_mut().elements.remove(0);
                self.release(removed)
            }
            "removeLast" => {
                let [] = take_arguments(arguments)?;
                let removed = array.borrow_mut().elements.pop();
                match removed {
                    Some(removed) => self.release(removed),
                    None => Err(array_index_out_of_bounds(-1, 0)),
                }
            }
            "contains" => {
                let [needle] = take_arguments(arguments)?;
                Ok(Value::Bool(array.borrow().elements.contains(&needle)))
            }
            "firstIndex" => {
                let [needle] = take_arguments(arguments)?;
                let position = array.borrow().elements.iter().position(|e| *e == needle);
                Ok(Value::optional(
                    position.map(|p| Value::Integer(IntegerValue::from_usize(p))),
                ))
            }
            "concat" => {
                let [other] = take_arguments(arguments)?;
                let Value::Array(other) = other else {
                    return Err(type_mismatch("array", other.type_name()));
                };
                let mut elements = self.copy_elements(array)?;
                elements.extend(self.copy_elements(&other)?);
                Ok(self.new_array(array.static_type(), elements, None))
            }
            "slice" => {
                let [from, up_to] = take_arguments(arguments)?;
                let from = expect_integer(&from)?.to_i128_saturating();
                let up_to = expect_integer(&up_to)?.to_i128_saturating();
                let length = array.len();
                let bound = |i: i128| usize::try_from(i).ok().filter(|i| *i <= length);
                let (Some(start), Some(end)) = (bound(from), bound(up_to)) else {
                    return Err(array_slice_indices(from, up_to, length));
                };
                if start > end {
                    return Err(invalid_slice_index(from, up_to));
                }
                let elements = self.copy_elements(array)?;
                let sliced = elements[start..end].to_vec();
                Ok(self.new_array(StaticType::array(element_type), sliced, None))
            }
            "reverse" => {
                let [] = take_arguments(arguments)?;
                let mut elements = self.copy_elements(array)?;
                elements.reverse();
                Ok(self.new_array(array.static_type(), elements, None))
            }
            "map" => {
                let [function] = take_arguments(arguments)?;
                let function = expect_function(function)?;
                let result_type = match function.static_type() {
                    StaticType::Function(signature) => signature.return_type.clone(),
                    _ => StaticType::AnyStruct,
                };
                let mut mapped = Vec::with_capacity(array.len());
                for element in self.copy_elements(array)? {
                    mapped.push(self.call_function(&function, vec![element], site)?);
                }
                Ok(self.new_array(StaticType::array(result_type), mapped, None))
            }
            "filter" => {
                let [function] = take_arguments(arguments)?;
                let function = expect_function(function)?;
                let mut kept = Vec::new();
                for element in self.copy_elements(array)? {
                    let argument = self.transfer(element.clone(), None)?;
                    let keep = self.call_function(&function, vec![argument], site)?;
                    if expect_bool(&keep)? {
                        kept.push(element);
                    }
                }
                Ok(self.new_array(StaticType::array(element_type), kept, None))
            }
            _ => Err(missing_member(method, array.static_type().to_string())),
        }
    }

    fn dictionary_method(
        &mut self,
        dictionary: &DictionaryValue,
        method: &str,
        arguments: Vec<Value>,
        site: &LocationRange,
    ) -> EvalResult {
        let owner = dictionary.borrow().header.owner;
        match method {
            "containsKey" => {
                let [key] = take_arguments(arguments)?;
                let key = hash_key(&key)?;
                Ok(Value::Bool(dictionary.get(&key).is_some()))
            }
            "insert" => {
                let [key, value] = take_arguments(arguments)?;
                let hashed = hash_key(&key)?;
                let container = Container::Dictionary(dictionary.clone());
                self.check_not_nested(&value, &container)?;
                let value = self.adopt(value, owner)?;
                let value = box_to(value, &dictionary.value_type());
                let old = dictionary.insert(hashed, key, value);
                self.release_optional(old)
            }
            "remove" => {
                let [key] = take_arguments(arguments)?;
                let key = hash_key(&key)?;
                let removed = dictionary.remove(&key);
                self.release_optional(removed)
            }
            "forEachKey" => {
                let [function] = take_arguments(arguments)?;
                let function = expect_function(function)?;
                for key in dictionary.keys() {
                    let key = self.transfer(key, None)?;
                    let more = self.call_function(&function, vec![key], site)?;
                    if !expect_bool(&more)? {
                        break;
                    }
                }
                Ok(Value::Void)
            }
            _ => Err(missing_member(method, dictionary.static_type().to_string())),
        }
    }

    /// Move `element` into `array`, typed as an element.
    fn adopt_element(
        &mut self,
        array: &ArrayValue,
        element: Value,
        owner: Option<Address>,
        element_type: &StaticType,
    ) -> EvalResult {
        self.check_not_nested(&element, &Container::Array(array.clone()))?;
        let element = self.adopt(element, owner)?;
        Ok(box_to(element, element_type))
    }

    /// Re-home an argument that was already transferred for the call.
    fn adopt(&mut self, value: Value, owner: Option<Address>) -> EvalResult {
        if owner.is_some() {
            self.transfer(value, owner)
        } else {
            Ok(value)
        }
    }

    /// Take a value out of a container.
    pub(crate) fn release(&mut self, value: Value) -> EvalResult {
        if value.is_resource() {
            return self.transfer(value, None);
        }
        let copy = self.transfer(value.clone(), None)?;
        self.discard(&value);
        Ok(copy)
    }

    fn release_optional(&mut self, value: Option<Value>) -> EvalResult {
        match value {
            Some(value) => Ok(Value::some(self.release(value)?)),
            None => Ok(Value::Nil),
        }
    }

    /// Copies of the elements of a non-resource array.
    fn copy_elements(&mut self, array: &ArrayValue) -> EvalResult<Vec<Value>> {
        if array.is_resource() {
            return Err(resource_copy(array.static_type().to_string()));
        }
        array
            .elements()
            .into_iter()
            .map(|element| self.transfer(element, None))
            .collect()
    }
}

fn string_method(string: &StringValue, method: &str, arguments: Vec<Value>) -> EvalResult {
    match method {
        "concat" => {
            let [other] = take_arguments(arguments)?;
            Ok(Value::String(string.concat(&expect_string(&other)?)))
        }
        "slice" => {
            let [from, up_to] = take_arguments(arguments)?;
            let from = expect_integer(&from)?.to_i128_saturating();
            let up_to = expect_integer(&up_to)?.to_i128_saturating();
            Ok(Value::String(string.slice(from, up_to)?))
        }
        "contains" => {
            let [other] = take_arguments(arguments)?;
            Ok(Value::Bool(string.contains(&expect_string(&other)?)))
        }
        "toLower" => {
            let [] = take_arguments(arguments)?;
            Ok(Value::String(string.to_lower()))
        }
        "replaceAll" => {
            let [of, with] = take_arguments(arguments)?;
            Ok(Value::String(
                string.replace_all(&expect_string(&of)?, &expect_string(&with)?),
            ))
        }
        _ => Err(missing_member(method, "String")),
    }
}

fn expect_string(value: &Value) -> EvalResult<StringValue> {
    match value {
        Value::String(s) | Value::Character(s) => Ok(s.clone()),
        other => Err(type_mismatch("String", other.type_name())),
    }
}

fn expect_function(value: Value) -> EvalResult<FunctionValue> {
    match value {
        Value::Function(function) => Ok(function),
        other => Err(type_mismatch("function", other.type_name())),
    }
}
