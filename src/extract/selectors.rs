// Copyright 2024 Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One compiled `Selector` per element class, built once. The teacher
//! keeps the equivalent set (`BASE`, `HREF_HOLDER`, `SRC_HOLDER`, ...) as
//! lazily-initialized statics next to the extraction function that uses
//! them.

use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:literal) => {
        pub static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(TITLE, "title");
selector!(META_DESCRIPTION, "meta[name=\"description\" i]");
selector!(LINK_CANONICAL, "link[rel=\"canonical\" i]");
selector!(META_ROBOTS, "meta[name=\"robots\" i]");
selector!(H1, "h1");
selector!(H2, "h2");

selector!(ANCHOR, "a[href]");
selector!(IMAGE, "img[src], img[srcset]");
selector!(SCRIPT, "script[src]");
selector!(STYLESHEET, "link[rel=\"stylesheet\" i]");
selector!(FONT_PRELOAD, "link[rel=\"preload\" i][as=\"font\" i]");
selector!(MODULEPRELOAD, "link[rel=\"modulepreload\" i]");
selector!(STYLE, "style");

selector!(SCRIPT_STYLE_NOSCRIPT, "script, style, noscript");

/// Boilerplate-ancestor containers / roles per §4.7.
selector!(
    BOILERPLATE_ANCESTOR,
    "nav, header, footer, aside, \
     [role=\"navigation\" i], [role=\"banner\" i], \
     [role=\"contentinfo\" i], [role=\"complementary\" i]"
);
