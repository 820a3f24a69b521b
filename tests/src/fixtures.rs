//! Programs exercising the supported language subset.

pub(crate) const CORPUS: &[(&str, &str)] = &[
    (
        "closures",
        r#"
        function counter(start) {
            var count = start;
            return {
                next: function () { return ++count; },
                reset: function () { count = start; }
            };
        }
        var c = counter(10);
        c.next();
        console.log("count is " + c.next());
        "#,
    ),
    (
        "loops",
        r#"
        function primes(limit) {
            var found = [];
            outer: for (var n = 2; n < limit; n++) {
                for (var d = 2; d * d <= n; d++) {
                    if (n % d === 0) continue outer;
                }
                found.push(n);
            }
            var i = 0;
            while (true) {
                if (i >= found.length) break;
                i++;
            }
            do { i--; } while (i > 0);
            return found.join(", ");
        }
        console.log(primes(30));
        "#,
    ),
    (
        "switch_and_exceptions",
        r#"
        function describe(value) {
            var kind;
            switch (typeof value) {
                case "number":
                    kind = value > 0 ? "positive" : "non-positive";
                    break;
                case "string":
                    kind = "text of length " + value.length;
                    break;
                default:
                    kind = "other";
            }
            try {
                if (kind === "other") throw new Error("unknown value");
            } catch (e) {
                kind = e.message;
            } finally {
                kind += "!";
            }
            return kind;
        }
        ["a", 1, null].forEach(function (v) { console.log(describe(v)); });
        "#,
    ),
    (
        "modern_syntax",
        r#"
        'use strict';
        const square = (x) => x * x;
        let total = 0;
        for (const v of [1, 2, 3]) { total += square(v); }
        const point = { x: 1, y: 2, get sum() { return this.x + this.y; }, ["k" + total]: true };
        const merged = { ...point, z: 3 };
        const text = `total=${total} sum=${merged.sum}`;
        const re = /t(o)tal=(\d+)/g;
        console.log(text.replace(re, "$1"), Math.max(...[total, 4]));
        "#,
    ),
    (
        "strings",
        r#"
        var greeting = "Hello, " + "wörld" + '\n' + "é\t\"quoted\"";
        var parts = greeting.split(" ");
        var obj = { "a key": 'value with spaces', other: "short" };
        function lookup(name) { return obj[name] || "missing: " + name; }
        console.log(lookup("a key"), lookup("other"), parts.length);
        "#,
    ),
    (
        "hoisting",
        r#"
        function run() {
            var result = helper(2);
            function helper(x) { return x * factor; }
            var factor = 3;
            result += helper(1);
            return result;
        }
        console.log(run());
        "#,
    ),
];
