#[cfg(test)]
pub const POST_DOC: &str = r#"---
title: "Shipping a Side Project"
description: "What it took to get it out the door"
category: "development"
tags: "rust, side-projects"
date: "2024-04-18T07:45:00.000Z"
author: "Ana Souza"
---

It started, as these things do, with a Saturday morning and an empty
repository.

The first version did one thing. The second version did the same thing
but survived a restart. By the fifth version it had opinions.
"#;

#[cfg(test)]
pub const POST_DOC_NO_FRONT_MATTER: &str = "Just a body that someone \
committed by hand, no metadata block at all.\n";

#[cfg(test)]
pub const CATEGORY_MANIFEST: &str = r#"[
  {
    "id": "design",
    "label": "Design",
    "createdAt": "2024-01-02T10:00:00.000Z",
    "updatedAt": "2024-01-02T10:00:00.000Z"
  },
  {
    "id": "development",
    "label": "Development",
    "createdAt": "2024-01-02T10:00:00.000Z",
    "updatedAt": "2024-03-11T16:30:00.000Z"
  }
]"#;
