//! Built-in email templates

pub const DEFAULT_BODY: &str = "Hello ${requester},

This is an automated status update for your ERF items.

SUMMARY:
${summary}
• Total Items: ${item_count}

ITEMS:
${items}

If you have any questions or concerns regarding these items, please don't hesitate to reach out.

Best regards,
Proto4Lab Team

---
This is an automated email generated on ${generated_at}
";

pub const DEFAULT_ITEM: &str = "${index}. ERF ${reference ?? 'N/A'} | ${material ?? 'N/A'} | \
${item ?? 'N/A'} | Qty ${quantity ?? 'N/A'} ${unit ?? ''} | ${status} | \
Commit Date: ${due_date ?? 'N/A'} | Expeditor: ${expeditor ?? 'N/A'} (${expeditor_status ?? 'N/A'}) | \
Remarks: ${remarks ?? 'N/A'}";

pub const DEFAULT_HTML_BODY: &str = "<html>
<body style=\"font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; color: #333;\">
<h2>Hello ${requester},</h2>
<p>This is an automated status update for your ERF items.</p>
<h3>Summary</h3>
<pre>${summary}
• Total Items: ${item_count}</pre>
<table border=\"1\" cellpadding=\"8\" cellspacing=\"0\" style=\"border-collapse: collapse; font-size: 12px; width: 100%;\">
<thead>
<tr style=\"background-color: #4CAF50; color: white;\">
<th>ERF Nr</th><th>Material</th><th>Material Description</th><th>ERF Itm Qty</th><th>Unit</th>\
<th>ERF Sched Line Status</th><th>END</th><th>Commit Date</th><th>Expeditor</th>\
<th>Expeditor Status</th><th>Expeditor Remarks</th>
</tr>
</thead>
<tbody>
${items}
</tbody>
</table>
<p>If you have any questions or concerns regarding these items, please don't hesitate to reach out.</p>
<p><strong>Best regards,<br>Proto4Lab Team</strong></p>
<p style=\"font-size: 11px; color: #666;\"><em>This is an automated email generated on ${generated_at}</em></p>
</body>
</html>
";

pub const DEFAULT_HTML_ITEM: &str = "<tr style=\"background-color: ${status == 'Received' ? '#D4EDDA' : '#FFF3CD'};\">\
<td>${reference ?? 'N/A'}</td><td>${material ?? 'N/A'}</td><td>${item ?? 'N/A'}</td>\
<td>${quantity ?? 'N/A'}</td><td>${unit ?? 'N/A'}</td><td>${status}</td><td>${end ?? 'N/A'}</td>\
<td>${due_date ?? 'N/A'}</td><td>${expeditor ?? 'N/A'}</td><td>${expeditor_status ?? 'N/A'}</td>\
<td>${remarks ?? 'N/A'}</td></tr>";
