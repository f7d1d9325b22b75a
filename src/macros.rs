// ============================================================================
// pulse-reactive - Ergonomic Macros
// ============================================================================

/// Build a `Value::Record` from literal keys.
///
/// # Usage
///
/// ```rust
/// use pulse_reactive::record;
///
/// let point = record! { x: 1, y: 2, label: "origin" };
/// let r = point.as_record().unwrap();
/// assert_eq!(r.get("x").as_num(), Some(1.0));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::core::value::Value::Record($crate::collections::record::Record::new())
    };
    ($($key:ident : $val:expr),+ $(,)?) => {{
        let rec = $crate::collections::record::Record::new();
        $( rec.set(stringify!($key), $crate::core::value::Value::from($val)); )+
        $crate::core::value::Value::Record(rec)
    }};
}

/// Build a `Value::Seq` from elements.
///
/// # Usage
///
/// ```rust
/// use pulse_reactive::seq;
///
/// let items = seq![1, 2, 3];
/// assert_eq!(items.as_seq().unwrap().len(), 3);
/// ```
#[macro_export]
macro_rules! seq {
    ($($item:expr),* $(,)?) => {{
        let items = vec![ $( $crate::core::value::Value::from($item) ),* ];
        $crate::core::value::Value::Seq(
            $crate::collections::sequence::Sequence::from_values(items),
        )
    }};
}

/// Clone variables into a move closure without the manual boilerplate.
///
/// # Usage
///
/// ```rust
/// use pulse_reactive::cloned;
/// use std::rc::Rc;
///
/// let name = Rc::new(String::from("a"));
/// let f = cloned!(name => move || name.len());
/// assert_eq!(f(), 1);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}
